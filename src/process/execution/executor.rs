/*!
 * Process Executor
 * Spawns job workloads as real OS processes and controls them with signals
 */

use super::preemption::{deliver, ControlSignal};
use super::readiness::{await_ready, ReadinessMode};
use crate::core::config::DispatcherConfig;
use crate::core::types::{JobId, OsPid};
use crate::process::traits::ProcessControl;
use crate::process::types::{Job, ProcessError, ProcessResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// How long `reap` lets a terminated workload exit on its own
const DEFAULT_REAP_GRACE: Duration = Duration::from_millis(500);
const REAP_POLL: Duration = Duration::from_millis(10);

/// A spawned workload
#[derive(Debug)]
pub struct ExecutingProcess {
    pub job: JobId,
    pub os_pid: OsPid,
    pub child: Child,
}

/// Process control over real OS processes
pub struct OsProcessControl {
    workload: PathBuf,
    args: Vec<String>,
    readiness: ReadinessMode,
    readiness_timeout: Duration,
    reap_grace: Duration,
    processes: HashMap<JobId, ExecutingProcess>,
}

impl OsProcessControl {
    pub fn new(workload: impl Into<PathBuf>) -> ProcessResult<Self> {
        let workload = workload.into();
        validate_workload(&workload)?;

        info!("Process executor initialized (workload: {})", workload.display());
        Ok(Self {
            workload,
            args: Vec::new(),
            readiness: ReadinessMode::Handshake,
            readiness_timeout: Duration::from_secs(2),
            reap_grace: DEFAULT_REAP_GRACE,
            processes: HashMap::new(),
        })
    }

    /// Executor for the configured workload and readiness mode
    pub fn from_config(config: &DispatcherConfig) -> ProcessResult<Self> {
        Ok(Self::new(&config.workload)?.with_readiness(config.readiness, config.readiness_timeout))
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_readiness(mut self, mode: ReadinessMode, timeout: Duration) -> Self {
        self.readiness = mode;
        self.readiness_timeout = timeout;
        self
    }

    pub fn with_reap_grace(mut self, grace: Duration) -> Self {
        self.reap_grace = grace;
        self
    }

    /// OS PID bound to a job, if it was spawned and not yet reaped
    pub fn get_os_pid(&self, job: JobId) -> Option<OsPid> {
        self.processes.get(&job).map(|p| p.os_pid)
    }

    /// Number of spawned, not yet reaped workloads
    pub fn count(&self) -> usize {
        self.processes.len()
    }

    /// Forget workloads that already exited on their own
    pub fn cleanup(&mut self) {
        self.processes.retain(|job, process| match process.child.try_wait() {
            Ok(Some(status)) => {
                info!("Job {} workload exited with status {:?}", job, status.code());
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("Error checking job {} workload: {}", job, e);
                false
            }
        });
    }

    fn reap_one(&self, mut process: ExecutingProcess) {
        let deadline = Instant::now() + self.reap_grace;

        loop {
            match process.child.try_wait() {
                Ok(Some(status)) => {
                    info!(
                        "Job {} workload (OS PID {}) exited with code {:?}",
                        process.job,
                        process.os_pid,
                        status.code()
                    );
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(REAP_POLL),
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to wait for job {} workload: {}", process.job, e);
                    break;
                }
            }
        }

        // SIGKILL also takes down a stopped process
        warn!(
            "Job {} workload (OS PID {}) still alive, killing",
            process.job, process.os_pid
        );
        if deliver(process.job, process.os_pid, ControlSignal::Kill).is_err() {
            let _ = process.child.kill();
        }
        if let Err(e) = process.child.wait() {
            error!("Failed to reap job {} workload: {}", process.job, e);
        }
    }
}

impl ProcessControl for OsProcessControl {
    fn start(&mut self, job: &Job) -> ProcessResult<OsPid> {
        self.cleanup();

        let mut cmd = Command::new(&self.workload);
        if !self.args.is_empty() {
            cmd.args(&self.args);
        }

        cmd.stdin(Stdio::null()).stderr(Stdio::inherit());
        if self.readiness.needs_stdout() {
            cmd.stdout(Stdio::piped());
        } else {
            cmd.stdout(Stdio::null());
        }

        // Keep terminal Ctrl-C away from workloads; shutdown interrupts them itself
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn().map_err(|e| ProcessError::SpawnFailed {
            job: job.id,
            reason: format!("{}: {}", self.workload.display(), e),
        })?;
        let os_pid = child.id();

        info!("Spawned workload for job {} (OS PID {})", job.id, os_pid);

        await_ready(&mut child, job.id, self.readiness, self.readiness_timeout);

        self.processes.insert(
            job.id,
            ExecutingProcess {
                job: job.id,
                os_pid,
                child,
            },
        );

        Ok(os_pid)
    }

    fn suspend(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()> {
        deliver(job, os_pid, ControlSignal::Pause)
    }

    fn resume(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()> {
        deliver(job, os_pid, ControlSignal::Continue)
    }

    fn terminate(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()> {
        // Earlier terminations have had at least a tick to exit by now
        self.cleanup();
        deliver(job, os_pid, ControlSignal::Interrupt)
    }

    fn reap(&mut self) {
        let processes: Vec<_> = self.processes.drain().map(|(_, p)| p).collect();
        if !processes.is_empty() {
            info!("Reaping {} workload processes", processes.len());
        }
        for process in processes {
            self.reap_one(process);
        }
    }
}

impl Drop for OsProcessControl {
    fn drop(&mut self) {
        self.reap();
    }
}

/// Reject empty paths and anything that looks like shell syntax
fn validate_workload(workload: &Path) -> ProcessResult<()> {
    let text = workload.to_string_lossy();

    if text.trim().is_empty() {
        return Err(ProcessError::InvalidWorkload("empty workload path".to_string()));
    }

    let dangerous_chars = [';', '|', '&', '\n', '\r', '\0', '`', '$', '(', ')'];
    if dangerous_chars.iter().any(|&c| text.contains(c)) {
        return Err(ProcessError::InvalidWorkload(format!(
            "'{}' contains shell metacharacters",
            text
        )));
    }

    Ok(())
}
