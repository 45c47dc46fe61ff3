/*!
 * Signal Delivery
 *
 * Maps control actions onto Unix signals and sends them to workload
 * processes. Pausing uses SIGSTOP rather than SIGTSTP: it cannot be caught
 * or ignored, so the workload's own signal dispositions never decide
 * whether it is actually paused.
 */

use crate::core::types::{JobId, OsPid};
use crate::process::types::{ProcessError, ProcessResult};
use tracing::{debug, warn};

#[cfg(unix)]
use nix::sys::signal::{kill, Signal as UnixSignal};
#[cfg(unix)]
use nix::unistd::Pid as NixPid;

/// Signal-level requests the executor can make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// SIGSTOP
    Pause,
    /// SIGCONT
    Continue,
    /// SIGINT, the workload's exit request
    Interrupt,
    /// SIGKILL, used only when reaping stragglers
    Kill,
}

impl ControlSignal {
    #[cfg(unix)]
    fn as_unix(self) -> UnixSignal {
        match self {
            ControlSignal::Pause => UnixSignal::SIGSTOP,
            ControlSignal::Continue => UnixSignal::SIGCONT,
            ControlSignal::Interrupt => UnixSignal::SIGINT,
            ControlSignal::Kill => UnixSignal::SIGKILL,
        }
    }
}

/// Send `signal` to `os_pid` without waiting for it to take effect
#[cfg(unix)]
pub fn deliver(job: JobId, os_pid: OsPid, signal: ControlSignal) -> ProcessResult<()> {
    let raw = i32::try_from(os_pid).map_err(|_| ProcessError::SignalFailed {
        job,
        os_pid,
        reason: "PID out of range".to_string(),
    })?;

    match kill(NixPid::from_raw(raw), signal.as_unix()) {
        Ok(()) => {
            debug!("Sent {:?} to job {} (OS PID {})", signal, job, os_pid);
            Ok(())
        }
        Err(e) => {
            warn!("Failed to send {:?} to job {} (OS PID {}): {}", signal, job, os_pid, e);
            Err(ProcessError::SignalFailed {
                job,
                os_pid,
                reason: e.to_string(),
            })
        }
    }
}

/// Non-Unix stub
#[cfg(not(unix))]
pub fn deliver(job: JobId, os_pid: OsPid, signal: ControlSignal) -> ProcessResult<()> {
    warn!(
        "Process control not supported on this platform (job {}, OS PID {}, {:?})",
        job, os_pid, signal
    );
    Err(ProcessError::Unsupported(format!("{:?}", signal)))
}
