/*!
 * Dispatcher Statistics
 * Counters kept by the scheduling loop and the final run outcome
 */

use crate::core::types::{JobId, Tick};
use crate::process::Job;
use serde::Serialize;
use uuid::Uuid;

/// Counters accumulated over a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Ticks executed
    pub ticks: Tick,
    /// Times a job was handed the CPU (starts and resumes)
    pub dispatches: u64,
    /// Running jobs suspended in favour of a waiting one
    pub preemptions: u64,
    /// Jobs that reached zero remaining time
    pub completed: u32,
    /// Jobs whose workload could not be spawned
    pub failed: Vec<JobId>,
}

/// Everything a finished run hands back to its caller
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub stats: DispatchStats,
    /// The loop was stopped by a shutdown request
    pub interrupted: bool,
    /// Final state of every job, ordered by id
    pub jobs: Vec<Job>,
}

impl RunOutcome {
    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    /// Every job either completed or failed to start
    pub fn all_settled(&self) -> bool {
        self.jobs.iter().all(|job| job.state().is_terminal())
    }
}
