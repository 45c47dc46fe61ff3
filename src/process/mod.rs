/*!
 * Process Management
 * Job model, lifecycle control and OS execution
 */

pub mod control;
pub mod execution;
pub mod simulated;
pub mod traits;
pub mod types;

pub use execution::{OsProcessControl, ReadinessMode};
pub use simulated::{ControlCall, SimulatedControl, SimulatedState};
pub use traits::ProcessControl;
pub use types::{ControlAction, Job, JobState, ProcessError, ProcessResult};
