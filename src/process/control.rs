/*!
 * Job Control
 *
 * Lifecycle operations on a job, layered over a [`ProcessControl`] backend.
 * These keep the job's bookkeeping (OS handle, started/finished flags) in
 * step with the requests issued to the backend:
 *
 * - `start` binds the handle only when the spawn succeeded
 * - signals to a job with no handle, or an already finished one, are no-ops
 * - `terminate` marks the job finished as soon as the request is issued
 */

use super::traits::ProcessControl;
use super::types::{Job, ProcessError, ProcessResult};
use crate::core::types::OsPid;
use tracing::debug;

/// Spawn the job's workload and bind its OS handle
pub fn start<C: ProcessControl + ?Sized>(control: &mut C, job: &mut Job) -> ProcessResult<OsPid> {
    if job.is_started() {
        return Err(ProcessError::AlreadyStarted(job.id));
    }

    let os_pid = control.start(job)?;
    job.bind(os_pid);
    Ok(os_pid)
}

/// Pause the job's workload
pub fn suspend<C: ProcessControl + ?Sized>(control: &mut C, job: &Job) -> ProcessResult<()> {
    match job.live_handle() {
        Some(os_pid) => control.suspend(job.id, os_pid),
        None => {
            debug!(job = job.id, "suspend skipped: no live handle");
            Ok(())
        }
    }
}

/// Continue the job's workload
pub fn resume<C: ProcessControl + ?Sized>(control: &mut C, job: &Job) -> ProcessResult<()> {
    match job.live_handle() {
        Some(os_pid) => control.resume(job.id, os_pid),
        None => {
            debug!(job = job.id, "resume skipped: no live handle");
            Ok(())
        }
    }
}

/// Ask the job's workload to exit; the job is finished from here on
pub fn terminate<C: ProcessControl + ?Sized>(control: &mut C, job: &mut Job) -> ProcessResult<()> {
    let result = match job.live_handle() {
        Some(os_pid) => control.terminate(job.id, os_pid),
        None => {
            debug!(job = job.id, "terminate skipped: no live handle");
            Ok(())
        }
    };
    job.mark_finished();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::simulated::SimulatedControl;
    use crate::process::ControlAction;

    #[test]
    fn test_start_binds_handle() {
        let mut control = SimulatedControl::new();
        let mut job = Job::new(1, 0, 0, 3).unwrap();

        let os_pid = start(&mut control, &mut job).unwrap();
        assert!(job.is_started());
        assert_eq!(job.os_pid(), Some(os_pid));
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut control = SimulatedControl::new();
        let mut job = Job::new(1, 0, 0, 3).unwrap();

        start(&mut control, &mut job).unwrap();
        assert_eq!(
            start(&mut control, &mut job),
            Err(ProcessError::AlreadyStarted(1))
        );
        assert_eq!(control.calls().len(), 1);
    }

    #[test]
    fn test_failed_start_leaves_job_unbound() {
        let mut control = SimulatedControl::new().fail_spawn_for(1);
        let mut job = Job::new(1, 0, 0, 3).unwrap();

        assert!(matches!(
            start(&mut control, &mut job),
            Err(ProcessError::SpawnFailed { job: 1, .. })
        ));
        assert!(!job.is_started());
        assert_eq!(job.os_pid(), None);
    }

    #[test]
    fn test_signals_on_unbound_job_are_noops() {
        let mut control = SimulatedControl::new();
        let mut job = Job::new(1, 0, 0, 3).unwrap();

        assert!(suspend(&mut control, &job).is_ok());
        assert!(resume(&mut control, &job).is_ok());
        assert!(terminate(&mut control, &mut job).is_ok());
        assert!(control.calls().is_empty());
        assert!(job.is_finished());
    }

    #[test]
    fn test_terminate_marks_finished_and_silences_job() {
        let mut control = SimulatedControl::new();
        let mut job = Job::new(1, 0, 0, 3).unwrap();

        start(&mut control, &mut job).unwrap();
        terminate(&mut control, &mut job).unwrap();
        assert!(job.is_finished());

        suspend(&mut control, &job).unwrap();
        resume(&mut control, &job).unwrap();

        let actions: Vec<_> = control.calls().iter().map(|c| c.action).collect();
        assert_eq!(actions, vec![ControlAction::Start, ControlAction::Terminate]);
    }
}
