/*!
 * Audit Log
 *
 * Human-readable event log mirrored to the console and a file, plus the
 * per-tick timeline exported as CSV when the run ends. If the log file
 * cannot be opened or written, logging degrades to console-only and the
 * scheduler is never interrupted.
 */

use super::sink::{write_timeline_csv, Action, Event, EventSink, SinkError};
use crate::core::types::{CpuTime, JobId, Tick};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

struct LogState {
    file: Option<BufWriter<File>>,
    lines: Vec<String>,
    timeline: BTreeMap<Tick, Option<JobId>>,
}

/// Event sink backed by a text log and a timeline CSV
pub struct FileEventLog {
    log_path: PathBuf,
    timeline_path: PathBuf,
    state: Mutex<LogState>,
}

impl FileEventLog {
    /// Open (truncate) the log file; failure leaves the sink console-only
    pub fn open(log_path: impl Into<PathBuf>, timeline_path: impl Into<PathBuf>) -> Self {
        let log_path = log_path.into();
        let timeline_path = timeline_path.into();

        let file = match create_log(&log_path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                warn!("{}; continuing with console-only logging", e);
                None
            }
        };

        Self {
            log_path,
            timeline_path,
            state: Mutex::new(LogState {
                file,
                lines: Vec::new(),
                timeline: BTreeMap::new(),
            }),
        }
    }

    /// Whether events are still reaching the log file
    pub fn is_persistent(&self) -> bool {
        self.state.lock().file.is_some()
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn timeline_path(&self) -> &Path {
        &self.timeline_path
    }

    /// Every line logged so far
    pub fn lines(&self) -> Vec<String> {
        self.state.lock().lines.clone()
    }

    /// Write the timeline CSV, returning the number of ticks exported
    pub fn export(&self) -> Result<usize, SinkError> {
        let state = self.state.lock();
        let rows = write_timeline_csv(
            &self.timeline_path,
            state.timeline.iter().map(|(tick, job)| (*tick, *job)),
        )?;
        info!(
            "Exported {} timeline rows to {}",
            rows,
            self.timeline_path.display()
        );
        Ok(rows)
    }

    /// Flush buffered log lines to disk
    pub fn flush(&self) {
        let mut state = self.state.lock();
        if let Some(file) = state.file.as_mut() {
            if let Err(e) = file.flush() {
                warn!("Cannot flush {}: {}", self.log_path.display(), e);
                state.file = None;
            }
        }
    }
}

impl EventSink for FileEventLog {
    fn record(&self, tick: Tick, job: Option<JobId>) {
        self.state.lock().timeline.insert(tick, job);
    }

    fn record_event(&self, tick: Tick, job: JobId, action: Action, remaining: CpuTime) {
        let line = Event {
            tick,
            job,
            action,
            remaining,
        }
        .to_string();

        info!(target: "rr_dispatcher::audit", "{}", line);

        let mut state = self.state.lock();
        if let Some(file) = state.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", line) {
                warn!(
                    "{}; continuing with console-only logging",
                    SinkError::write(&self.log_path, e)
                );
                state.file = None;
            }
        }
        state.lines.push(line);
    }
}

impl Drop for FileEventLog {
    fn drop(&mut self) {
        self.flush();
    }
}

fn create_log(path: &Path) -> Result<File, SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SinkError::open(path, e))?;
    }
    File::create(path).map_err(|e| SinkError::open(path, e))
}
