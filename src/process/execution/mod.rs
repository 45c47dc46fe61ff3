/*!
 * Process Execution
 * OS-level process spawning, signal delivery and readiness
 */

pub mod executor;
pub mod preemption;
pub mod readiness;

// Re-export public types
pub use executor::{ExecutingProcess, OsProcessControl};
pub use preemption::{deliver, ControlSignal};
pub use readiness::{Readiness, ReadinessMode, READY_LINE};
