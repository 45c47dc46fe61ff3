/*!
 * Process Types
 * Job model, lifecycle states and process errors
 */

use crate::core::types::{CpuTime, JobId, OsPid, Priority, Tick};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Process operation result
///
/// # Must Use
/// Spawn failures must be handled so the job is excluded from every queue
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Process errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ProcessError {
    #[error("Spawn failed for job {job}: {reason}")]
    #[diagnostic(
        code(process::spawn_failed),
        help("Check that the workload executable exists and is executable.")
    )]
    SpawnFailed { job: JobId, reason: String },

    #[error("Invalid workload: {0}")]
    #[diagnostic(
        code(process::invalid_workload),
        help("The workload must be a plain executable path without shell syntax.")
    )]
    InvalidWorkload(String),

    #[error("Failed to signal job {job} (OS PID {os_pid}): {reason}")]
    #[diagnostic(
        code(process::signal_failed),
        help("The process may already have exited.")
    )]
    SignalFailed {
        job: JobId,
        os_pid: OsPid,
        reason: String,
    },

    #[error("Invalid state transition for job {job}: {from:?} -> {to:?}")]
    #[diagnostic(code(process::invalid_transition))]
    InvalidStateTransition {
        job: JobId,
        from: JobState,
        to: JobState,
    },

    #[error("Invalid job: {0}")]
    #[diagnostic(
        code(process::invalid_job),
        help("Jobs need a unique id and a positive CPU time.")
    )]
    InvalidJob(String),

    #[error("Job {0} was already started")]
    #[diagnostic(code(process::already_started))]
    AlreadyStarted(JobId),

    #[error("Process control not supported: {0}")]
    #[diagnostic(
        code(process::unsupported),
        help("Real process control requires a Unix platform. Use RR_SIMULATE=1 instead.")
    )]
    Unsupported(String),
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Loaded, arrival time not yet reached
    Pending,
    /// Arrived, waiting in the ready queue
    Ready,
    /// Occupying the CPU
    Running,
    /// Remaining time reached zero
    Terminated,
    /// Workload could not be spawned
    Failed,
}

impl JobState {
    /// Whether `self -> to` is an edge of the lifecycle graph
    #[inline]
    #[must_use]
    pub const fn can_transition(self, to: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, to),
            (Pending, Ready)
                | (Ready, Running)
                | (Ready, Failed)
                | (Running, Ready)
                | (Running, Terminated)
        )
    }

    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, JobState::Terminated | JobState::Failed)
    }
}

/// Control action issued against a job's workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Suspend,
    Resume,
    Terminate,
}

/// A unit of work and its OS binding
///
/// Static attributes are fixed at load time. Remaining time only ever goes
/// down, one tick at a time, and only while the job is `Running`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Job {
    pub id: JobId,
    pub arrival: Tick,
    pub priority: Priority,
    pub total: CpuTime,
    remaining: CpuTime,
    state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    os_pid: Option<OsPid>,
    started: bool,
    finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_dispatch: Option<Tick>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<Tick>,
    ticks_run: CpuTime,
}

impl Job {
    /// Create a pending job
    pub fn new(id: JobId, arrival: Tick, priority: Priority, total: CpuTime) -> ProcessResult<Self> {
        if total == 0 {
            return Err(ProcessError::InvalidJob(format!(
                "job {} has zero CPU time",
                id
            )));
        }

        Ok(Self {
            id,
            arrival,
            priority,
            total,
            remaining: total,
            state: JobState::Pending,
            os_pid: None,
            started: false,
            finished: false,
            first_dispatch: None,
            completed_at: None,
            ticks_run: 0,
        })
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> CpuTime {
        self.remaining
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> JobState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn os_pid(&self) -> Option<OsPid> {
        self.os_pid
    }

    #[inline]
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Handle that control signals may still be sent to
    #[inline]
    #[must_use]
    pub fn live_handle(&self) -> Option<OsPid> {
        if self.finished {
            None
        } else {
            self.os_pid
        }
    }

    /// Ticks this job actually occupied the CPU
    #[inline]
    #[must_use]
    pub fn ticks_run(&self) -> CpuTime {
        self.ticks_run
    }

    /// Tick of the first successful dispatch
    #[inline]
    #[must_use]
    pub fn first_dispatch(&self) -> Option<Tick> {
        self.first_dispatch
    }

    /// Tick at which remaining time reached zero
    #[inline]
    #[must_use]
    pub fn completed_at(&self) -> Option<Tick> {
        self.completed_at
    }

    /// Move to `to`, rejecting edges outside the lifecycle graph
    pub fn transition(&mut self, to: JobState) -> ProcessResult<()> {
        if !self.state.can_transition(to) {
            return Err(ProcessError::InvalidStateTransition {
                job: self.id,
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Account one tick of CPU work, returning the new remaining time
    pub fn consume_tick(&mut self) -> ProcessResult<CpuTime> {
        if self.state != JobState::Running || self.remaining == 0 {
            return Err(ProcessError::InvalidStateTransition {
                job: self.id,
                from: self.state,
                to: JobState::Running,
            });
        }
        self.remaining -= 1;
        self.ticks_run += 1;
        Ok(self.remaining)
    }

    /// Bind the OS handle returned by a successful start
    pub(crate) fn bind(&mut self, os_pid: OsPid) {
        self.os_pid = Some(os_pid);
        self.started = true;
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub(crate) fn note_dispatch(&mut self, tick: Tick) {
        self.first_dispatch.get_or_insert(tick);
    }

    pub(crate) fn note_completion(&mut self, tick: Tick) {
        self.completed_at = Some(tick);
    }
}
