/*!
 * Process Traits
 * Process control abstraction
 */

use super::types::{Job, ProcessResult};
use crate::core::types::{JobId, OsPid};

/// Lifecycle control over the execution unit backing a job
///
/// Every operation only reports whether the request could be *issued*.
/// Nothing here confirms the state the OS process actually ended up in, so
/// the OS backend and the in-memory fake are interchangeable.
///
/// Signal operations take the bound OS handle explicitly: a job without a
/// handle never reaches an implementation (see [`super::control`]).
pub trait ProcessControl {
    /// Spawn the workload for `job`, returning its OS handle
    fn start(&mut self, job: &Job) -> ProcessResult<OsPid>;

    /// Pause the workload
    fn suspend(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()>;

    /// Continue a paused workload
    fn resume(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()>;

    /// Ask the workload to exit
    fn terminate(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()>;

    /// Collect every spawned execution unit, forcing stragglers down
    fn reap(&mut self);
}

impl<C: ProcessControl + ?Sized> ProcessControl for Box<C> {
    fn start(&mut self, job: &Job) -> ProcessResult<OsPid> {
        (**self).start(job)
    }

    fn suspend(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()> {
        (**self).suspend(job, os_pid)
    }

    fn resume(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()> {
        (**self).resume(job, os_pid)
    }

    fn terminate(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()> {
        (**self).terminate(job, os_pid)
    }

    fn reap(&mut self) {
        (**self).reap()
    }
}
