/*!
 * Event Sinks
 *
 * Append-only destinations for the per-tick timeline and for lifecycle
 * events. Sinks take `&self` and serialize writes internally, one lock scope
 * per call, so a single sink can be shared behind an `Arc`.
 */

use crate::core::types::{CpuTime, JobId, Tick, IDLE_JOB};
use miette::Diagnostic;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Sink errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SinkError {
    #[error("Cannot open {path}: {reason}")]
    #[diagnostic(
        code(sink::open_failed),
        help("Check that the directory exists and is writable.")
    )]
    Open { path: String, reason: String },

    #[error("Cannot write {path}: {reason}")]
    #[diagnostic(code(sink::write_failed))]
    Write { path: String, reason: String },

    #[error("Serialization failed: {0}")]
    #[diagnostic(code(sink::serialization_failed))]
    Serialization(String),
}

impl SinkError {
    pub(crate) fn open(path: &Path, err: impl fmt::Display) -> Self {
        SinkError::Open {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, err: impl fmt::Display) -> Self {
        SinkError::Write {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Lifecycle transition reported by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Started,
    Resumed,
    Suspended,
    Terminated,
    /// Workload could not be spawned
    Failed,
    /// Stopped by a shutdown request before finishing its work
    Interrupted,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Started => "started",
            Action::Resumed => "resumed",
            Action::Suspended => "suspended",
            Action::Terminated => "terminated",
            Action::Failed => "failed",
            Action::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded lifecycle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Event {
    pub tick: Tick,
    pub job: JobId,
    pub action: Action,
    pub remaining: CpuTime,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>4}s] Job {} - {} (remaining: {})",
            self.tick, self.job, self.action, self.remaining
        )
    }
}

/// Destination for scheduler observations
pub trait EventSink: Send + Sync {
    /// Which job (if any) occupied the CPU during `tick`; called once per tick
    fn record(&self, tick: Tick, job: Option<JobId>);

    /// A lifecycle transition of `job` at `tick`
    fn record_event(&self, tick: Tick, job: JobId, action: Action, remaining: CpuTime);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn record(&self, tick: Tick, job: Option<JobId>) {
        (**self).record(tick, job)
    }

    fn record_event(&self, tick: Tick, job: JobId, action: Action, remaining: CpuTime) {
        (**self).record_event(tick, job, action, remaining)
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _tick: Tick, _job: Option<JobId>) {}

    fn record_event(&self, _tick: Tick, _job: JobId, _action: Action, _remaining: CpuTime) {}
}

#[derive(Debug, Default)]
struct MemoryLog {
    timeline: Vec<(Tick, Option<JobId>)>,
    events: Vec<Event>,
}

/// Sink that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<MemoryLog>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(tick, occupant)` pairs in recording order
    pub fn timeline(&self) -> Vec<(Tick, Option<JobId>)> {
        self.inner.lock().timeline.clone()
    }

    /// Occupant of every tick, in recording order
    pub fn occupancy(&self) -> Vec<Option<JobId>> {
        self.inner.lock().timeline.iter().map(|(_, job)| *job).collect()
    }

    /// Occupied ticks only, idle ticks dropped
    pub fn busy_sequence(&self) -> Vec<JobId> {
        self.inner
            .lock()
            .timeline
            .iter()
            .filter_map(|(_, job)| *job)
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().events.clone()
    }

    pub fn events_for(&self, job: JobId) -> Vec<Event> {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|event| event.job == job)
            .copied()
            .collect()
    }

    /// Write the timeline as CSV
    pub fn export_csv(&self, path: &Path) -> Result<usize, SinkError> {
        let timeline = self.timeline();
        write_timeline_csv(path, timeline.iter().copied())
    }
}

impl EventSink for MemorySink {
    fn record(&self, tick: Tick, job: Option<JobId>) {
        self.inner.lock().timeline.push((tick, job));
    }

    fn record_event(&self, tick: Tick, job: JobId, action: Action, remaining: CpuTime) {
        self.inner.lock().events.push(Event {
            tick,
            job,
            action,
            remaining,
        });
    }
}

/// Fans every call out to two sinks, in order
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A: EventSink, B: EventSink> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: EventSink, B: EventSink> EventSink for Tee<A, B> {
    fn record(&self, tick: Tick, job: Option<JobId>) {
        self.first.record(tick, job);
        self.second.record(tick, job);
    }

    fn record_event(&self, tick: Tick, job: JobId, action: Action, remaining: CpuTime) {
        self.first.record_event(tick, job, action, remaining);
        self.second.record_event(tick, job, action, remaining);
    }
}

/// Write `time,jobId` rows (idle as -1), returning the number of rows
pub fn write_timeline_csv<I>(path: &Path, rows: I) -> Result<usize, SinkError>
where
    I: IntoIterator<Item = (Tick, Option<JobId>)>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SinkError::open(path, e))?;
    }

    let file = File::create(path).map_err(|e| SinkError::open(path, e))?;
    let mut out = BufWriter::new(file);
    let mut count = 0;

    writeln!(out, "time,jobId").map_err(|e| SinkError::write(path, e))?;
    for (tick, job) in rows {
        let id = job.map(i64::from).unwrap_or(IDLE_JOB);
        writeln!(out, "{},{}", tick, id).map_err(|e| SinkError::write(path, e))?;
        count += 1;
    }
    out.flush().map_err(|e| SinkError::write(path, e))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_line_format() {
        let event = Event {
            tick: 7,
            job: 2,
            action: Action::Suspended,
            remaining: 3,
        };
        assert_eq!(event.to_string(), "[   7s] Job 2 - suspended (remaining: 3)");
    }

    #[test]
    fn test_memory_sink_preserves_order() {
        let sink = MemorySink::new();
        sink.record(0, None);
        sink.record_event(0, 1, Action::Started, 2);
        sink.record(1, Some(1));
        sink.record_event(1, 1, Action::Terminated, 0);

        assert_eq!(sink.occupancy(), vec![None, Some(1)]);
        assert_eq!(sink.busy_sequence(), vec![1]);
        let actions: Vec<_> = sink.events().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![Action::Started, Action::Terminated]);
    }

    #[test]
    fn test_tee_feeds_both() {
        let a = Arc::new(MemorySink::new());
        let b = Arc::new(MemorySink::new());
        let tee = Tee::new(Arc::clone(&a), Arc::clone(&b));

        tee.record(0, Some(3));
        tee.record_event(0, 3, Action::Started, 1);

        assert_eq!(a.occupancy(), b.occupancy());
        assert_eq!(a.events(), b.events());
    }

    #[test]
    fn test_shared_sink_across_threads() {
        let sink = Arc::new(MemorySink::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        sink.record_event(i, t, Action::Resumed, 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.events().len(), 400);
    }
}
