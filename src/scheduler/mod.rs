/*!
 * Scheduler Module
 * Round-robin dispatching of jobs onto a single CPU
 */

pub mod dispatcher;
pub mod queue;
pub mod stats;

// Re-export public API
pub use dispatcher::Dispatcher;
pub use queue::{AdmissionQueue, ReadyQueue};
pub use stats::{DispatchStats, RunOutcome};
