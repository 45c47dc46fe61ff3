/*!
 * Core Types
 * Common types used across the dispatcher
 */

/// Job identifier (1-based, assigned at load time)
pub type JobId = u32;

/// Simulated time, in ticks since the dispatcher started
pub type Tick = u64;

/// Amount of CPU work, in ticks
pub type CpuTime = u32;

/// Job priority (carried through, unused by round robin)
pub type Priority = i32;

/// OS-level process identifier of a spawned workload
pub type OsPid = u32;

/// Sentinel written to the timeline export for idle ticks
pub const IDLE_JOB: i64 = -1;

/// Common result type for dispatcher operations
pub type DispatchResult<T> = Result<T, super::errors::DispatcherError>;
