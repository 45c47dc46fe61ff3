/*!
 * Round-Robin Dispatcher Library
 * Preemptive round-robin scheduling of real OS processes driven by signals
 */

pub mod core;
pub mod jobs;
pub mod monitoring;
pub mod process;
pub mod scheduler;

// Re-exports
pub use crate::core::{ConfigError, DispatchResult, DispatcherConfig, DispatcherError};
pub use jobs::{load_jobs, parse_jobs, GeneratorConfig, LoadError, LoadReport};
pub use monitoring::{init_tracing, Action, EventSink, FileEventLog, MemorySink, NullSink, RunReport};
pub use process::{
    Job, JobState, OsProcessControl, ProcessControl, ProcessError, ReadinessMode, SimulatedControl,
};
pub use scheduler::{Dispatcher, DispatchStats, RunOutcome};
