/*!
 * Core Module
 * Fundamental dispatcher types, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod types;

// Re-export for convenience
pub use config::{ConfigError, DispatcherConfig};
pub use errors::DispatcherError;
pub use types::*;
