/*!
 * Monitoring
 * Event sinks, audit log, run reports and tracing setup
 */

mod event_log;
mod report;
mod sink;
mod tracer;

pub use event_log::FileEventLog;
pub use report::{Averages, JobReport, RunReport};
pub use sink::{write_timeline_csv, Action, Event, EventSink, MemorySink, NullSink, SinkError, Tee};
pub use tracer::init_tracing;
