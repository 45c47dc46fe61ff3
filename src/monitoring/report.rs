/*!
 * Run Report
 *
 * Per-job scheduling metrics and run-wide averages:
 *
 * - turnaround = completion - arrival
 * - waiting    = turnaround - burst
 * - response   = first dispatch - arrival
 *
 * Only jobs that ran to completion are measured; failed or interrupted jobs
 * are listed separately.
 */

use super::sink::SinkError;
use crate::core::types::{CpuTime, JobId, Tick};
use crate::scheduler::RunOutcome;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use uuid::Uuid;

/// Metrics for one completed job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    pub job: JobId,
    pub arrival: Tick,
    pub start: Tick,
    pub completion: Tick,
    pub burst: CpuTime,
    pub turnaround: u64,
    pub waiting: u64,
    pub response: u64,
}

/// Averages over completed jobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Averages {
    pub turnaround: f64,
    pub waiting: f64,
    pub response: f64,
}

/// Summary of one dispatcher run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub ticks: Tick,
    pub dispatches: u64,
    pub preemptions: u64,
    pub interrupted: bool,
    pub failed: Vec<JobId>,
    pub unfinished: Vec<JobId>,
    pub jobs: Vec<JobReport>,
    pub averages: Averages,
}

impl RunReport {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let mut jobs: Vec<JobReport> = outcome
            .jobs
            .iter()
            .filter_map(|job| {
                let start = job.first_dispatch()?;
                let completion = job.completed_at()?;
                let turnaround = completion.saturating_sub(job.arrival);
                Some(JobReport {
                    job: job.id,
                    arrival: job.arrival,
                    start,
                    completion,
                    burst: job.total,
                    turnaround,
                    waiting: turnaround.saturating_sub(u64::from(job.total)),
                    response: start.saturating_sub(job.arrival),
                })
            })
            .collect();
        jobs.sort_by_key(|report| report.job);

        let unfinished = outcome
            .jobs
            .iter()
            .filter(|job| job.completed_at().is_none() && !outcome.stats.failed.contains(&job.id))
            .map(|job| job.id)
            .collect();

        Self {
            run_id: outcome.run_id,
            ticks: outcome.stats.ticks,
            dispatches: outcome.stats.dispatches,
            preemptions: outcome.stats.preemptions,
            interrupted: outcome.interrupted,
            failed: outcome.stats.failed.clone(),
            unfinished,
            averages: averages(&jobs),
            jobs,
        }
    }

    /// Tab-separated table followed by the averages
    pub fn to_table(&self) -> String {
        let mut out = String::from("Job\tArrival\tStart\tCompletion\tBurst\tTurnaround\tWaiting\tResponse\n");
        for r in &self.jobs {
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                r.job, r.arrival, r.start, r.completion, r.burst, r.turnaround, r.waiting, r.response
            );
        }
        let _ = writeln!(out, "\nAverages:");
        let _ = writeln!(out, "Average Turnaround Time: {:.2}", self.averages.turnaround);
        let _ = writeln!(out, "Average Waiting Time: {:.2}", self.averages.waiting);
        let _ = writeln!(out, "Average Response Time: {:.2}", self.averages.response);
        out
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<(), SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SinkError::open(path, e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SinkError::Serialization(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| SinkError::write(path, e))
    }
}

fn averages(jobs: &[JobReport]) -> Averages {
    if jobs.is_empty() {
        return Averages::default();
    }
    let n = jobs.len() as f64;
    let sum = |f: fn(&JobReport) -> u64| jobs.iter().map(f).sum::<u64>() as f64 / n;
    Averages {
        turnaround: sum(|r| r.turnaround),
        waiting: sum(|r| r.waiting),
        response: sum(|r| r.response),
    }
}
