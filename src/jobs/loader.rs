/*!
 * Job Loader
 *
 * Reads a dispatch list: one comma-separated record per line,
 * `arrival, priority, total[, ...]`. Fields past the third are ignored.
 * Blank lines and lines starting with `#` are skipped silently; malformed
 * records are skipped with a warning and do not consume an id.
 */

use crate::core::types::{CpuTime, JobId, Priority, Tick};
use crate::process::Job;
use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Job file errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum LoadError {
    #[error("Cannot read job file {path}: {reason}")]
    #[diagnostic(
        code(load::read_failed),
        help("Pass the dispatch list as the first argument or set RR_JOB_FILE.")
    )]
    Io { path: String, reason: String },

    #[error("Cannot write job file {path}: {reason}")]
    #[diagnostic(code(load::write_failed))]
    Write { path: String, reason: String },
}

/// Why a single record was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected at least 3 fields, found {0}")]
    TooFewFields(usize),

    #[error("{field} is not an integer: {value:?}")]
    NotAnInteger { field: &'static str, value: String },

    #[error("arrival must not be negative, got {0}")]
    NegativeArrival(i64),

    #[error("total CPU time must be positive, got {0}")]
    NonPositiveTotal(i64),

    #[error("total CPU time {0} is out of range")]
    TotalOutOfRange(i64),
}

/// A parsed, validated record that has not been given an id yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobRecord {
    pub arrival: Tick,
    pub priority: Priority,
    pub total: CpuTime,
}

/// A line the loader refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// 1-based line number in the source
    pub line_no: usize,
    pub line: String,
    pub reason: RecordError,
}

/// Result of loading a dispatch list
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Accepted jobs, sorted by (arrival, id)
    pub jobs: Vec<Job>,
    pub skipped: Vec<SkippedRecord>,
}

impl LoadReport {
    pub fn into_jobs(self) -> Vec<Job> {
        self.jobs
    }
}

/// Parse one non-comment line
pub fn parse_record(line: &str) -> Result<JobRecord, RecordError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 3 {
        return Err(RecordError::TooFewFields(fields.len()));
    }

    let arrival = integer::<i64>("arrival", fields[0])?;
    let priority = integer::<Priority>("priority", fields[1])?;
    let total = integer::<i64>("total", fields[2])?;

    if arrival < 0 {
        return Err(RecordError::NegativeArrival(arrival));
    }
    if total <= 0 {
        return Err(RecordError::NonPositiveTotal(total));
    }
    let total = CpuTime::try_from(total).map_err(|_| RecordError::TotalOutOfRange(total))?;

    Ok(JobRecord {
        arrival: arrival as Tick,
        priority,
        total,
    })
}

fn integer<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, RecordError> {
    value.parse::<T>().map_err(|_| RecordError::NotAnInteger {
        field,
        value: value.to_string(),
    })
}

/// Parse a whole dispatch list
///
/// Ids are handed out 1, 2, 3... to accepted records in input order; the
/// returned jobs are then sorted by (arrival, id).
pub fn parse_jobs(text: &str) -> LoadReport {
    let mut report = LoadReport::default();
    let mut next_id: JobId = 1;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let record = match parse_record(line) {
            Ok(record) => record,
            Err(reason) => {
                warn!("Skipping malformed line {}: {:?} ({})", idx + 1, line, reason);
                report.skipped.push(SkippedRecord {
                    line_no: idx + 1,
                    line: line.to_string(),
                    reason,
                });
                continue;
            }
        };

        match Job::new(next_id, record.arrival, record.priority, record.total) {
            Ok(job) => {
                report.jobs.push(job);
                next_id += 1;
            }
            Err(e) => warn!("Skipping line {}: {}", idx + 1, e),
        }
    }

    report.jobs.sort_by_key(|job| (job.arrival, job.id));
    report
}

/// Load a dispatch list from disk
pub fn load_jobs(path: &Path) -> Result<LoadReport, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let report = parse_jobs(&text);
    info!(
        "Loaded {} jobs from {} ({} skipped)",
        report.jobs.len(),
        path.display(),
        report.skipped.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_ignores_extra_fields() {
        let record = parse_record("4, 3, 2, 64, 0, 0, 0, 0").unwrap();
        assert_eq!(
            record,
            JobRecord {
                arrival: 4,
                priority: 3,
                total: 2
            }
        );
    }

    #[test]
    fn test_parse_record_rejections() {
        assert_eq!(parse_record("1, 2"), Err(RecordError::TooFewFields(2)));
        assert_eq!(parse_record("-1, 0, 3"), Err(RecordError::NegativeArrival(-1)));
        assert_eq!(parse_record("0, 0, 0"), Err(RecordError::NonPositiveTotal(0)));
        assert!(matches!(
            parse_record("x, 0, 3"),
            Err(RecordError::NotAnInteger { field: "arrival", .. })
        ));
        assert!(matches!(
            parse_record("0, 0, 9999999999"),
            Err(RecordError::TotalOutOfRange(_))
        ));
    }

    #[test]
    fn test_ids_follow_input_order_and_skip_bad_lines() {
        let text = "# arrival, priority, total\n\n5, 1, 2\nbogus\n0, 1, 3\n0, 1, 1\n";
        let report = parse_jobs(text);

        let loaded: Vec<_> = report.jobs.iter().map(|j| (j.id, j.arrival, j.total)).collect();
        assert_eq!(loaded, vec![(2, 0, 3), (3, 0, 1), (1, 5, 2)]);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line_no, 4);
        assert_eq!(report.skipped[0].line, "bogus");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = load_jobs(Path::new("/nonexistent/dispatchlist.txt"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
