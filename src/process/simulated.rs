/*!
 * Simulated Process Control
 *
 * In-memory stand-in for real OS processes. Models the signal semantics the
 * dispatcher relies on (a stopped process does not act on a terminate
 * request until it is continued) and records every issued call, so the
 * dispatcher can be exercised without spawning anything.
 */

use super::traits::ProcessControl;
use super::types::{ControlAction, Job, ProcessError, ProcessResult};
use crate::core::types::{JobId, OsPid};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

const FIRST_SIMULATED_PID: OsPid = 10_000;

/// One request issued to the control backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlCall {
    pub job: JobId,
    pub os_pid: Option<OsPid>,
    pub action: ControlAction,
}

/// What the simulated OS believes a process is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedState {
    Running,
    Stopped,
    Exited,
}

/// Process control backed by an in-memory process table
#[derive(Debug)]
pub struct SimulatedControl {
    next_pid: OsPid,
    fail_spawns: HashSet<JobId>,
    calls: Vec<ControlCall>,
    processes: BTreeMap<OsPid, SimulatedState>,
    pending_exit: HashSet<OsPid>,
    forced_kills: usize,
}

impl SimulatedControl {
    pub fn new() -> Self {
        Self {
            next_pid: FIRST_SIMULATED_PID,
            fail_spawns: HashSet::new(),
            calls: Vec::new(),
            processes: BTreeMap::new(),
            pending_exit: HashSet::new(),
            forced_kills: 0,
        }
    }

    /// Make every spawn attempt for `job` fail
    pub fn fail_spawn_for(mut self, job: JobId) -> Self {
        self.fail_spawns.insert(job);
        self
    }

    /// Every call issued so far, in order
    pub fn calls(&self) -> &[ControlCall] {
        &self.calls
    }

    /// Calls issued for a single job, in order
    pub fn actions_for(&self, job: JobId) -> Vec<ControlAction> {
        self.calls
            .iter()
            .filter(|call| call.job == job)
            .map(|call| call.action)
            .collect()
    }

    pub fn state_of(&self, os_pid: OsPid) -> Option<SimulatedState> {
        self.processes.get(&os_pid).copied()
    }

    /// Processes currently burning CPU
    pub fn running_count(&self) -> usize {
        self.processes
            .values()
            .filter(|state| **state == SimulatedState::Running)
            .count()
    }

    /// Processes that had to be killed by `reap`
    pub fn forced_kills(&self) -> usize {
        self.forced_kills
    }

    pub fn spawned(&self) -> usize {
        self.processes.len()
    }

    fn record(&mut self, job: JobId, os_pid: Option<OsPid>, action: ControlAction) {
        self.calls.push(ControlCall {
            job,
            os_pid,
            action,
        });
    }

    fn lookup(&self, job: JobId, os_pid: OsPid) -> ProcessResult<SimulatedState> {
        match self.processes.get(&os_pid) {
            Some(SimulatedState::Exited) | None => Err(ProcessError::SignalFailed {
                job,
                os_pid,
                reason: "no such process".to_string(),
            }),
            Some(state) => Ok(*state),
        }
    }
}

impl ProcessControl for SimulatedControl {
    fn start(&mut self, job: &Job) -> ProcessResult<OsPid> {
        if self.fail_spawns.contains(&job.id) {
            self.record(job.id, None, ControlAction::Start);
            return Err(ProcessError::SpawnFailed {
                job: job.id,
                reason: "simulated spawn failure".to_string(),
            });
        }

        let os_pid = self.next_pid;
        self.next_pid += 1;
        self.processes.insert(os_pid, SimulatedState::Running);
        self.record(job.id, Some(os_pid), ControlAction::Start);
        debug!(job = job.id, os_pid, "simulated spawn");
        Ok(os_pid)
    }

    fn suspend(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()> {
        self.record(job, Some(os_pid), ControlAction::Suspend);
        self.lookup(job, os_pid)?;
        self.processes.insert(os_pid, SimulatedState::Stopped);
        Ok(())
    }

    fn resume(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()> {
        self.record(job, Some(os_pid), ControlAction::Resume);
        self.lookup(job, os_pid)?;
        let next = if self.pending_exit.remove(&os_pid) {
            SimulatedState::Exited
        } else {
            SimulatedState::Running
        };
        self.processes.insert(os_pid, next);
        Ok(())
    }

    fn terminate(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()> {
        self.record(job, Some(os_pid), ControlAction::Terminate);
        match self.lookup(job, os_pid)? {
            SimulatedState::Stopped => {
                // Delivered once the process is continued
                self.pending_exit.insert(os_pid);
            }
            _ => {
                self.processes.insert(os_pid, SimulatedState::Exited);
            }
        }
        Ok(())
    }

    fn reap(&mut self) {
        for state in self.processes.values_mut() {
            if *state != SimulatedState::Exited {
                *state = SimulatedState::Exited;
                self.forced_kills += 1;
            }
        }
        self.pending_exit.clear();
    }
}

impl Default for SimulatedControl {
    fn default() -> Self {
        Self::new()
    }
}
