/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use miette::Diagnostic;
use thiserror::Error;

pub use super::config::ConfigError;
pub use crate::jobs::LoadError;
pub use crate::monitoring::SinkError;
pub use crate::process::ProcessError;

/// Unified dispatcher error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum DispatcherError {
    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Job load error: {0}")]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    #[error("Process error: {0}")]
    #[diagnostic(transparent)]
    Process(#[from] ProcessError),

    #[error("Sink error: {0}")]
    #[diagnostic(transparent)]
    Sink(#[from] SinkError),

    #[error("Internal error: {0}")]
    #[diagnostic(
        code(dispatcher::internal_error),
        help("An unexpected internal error occurred. Please report this issue.")
    )]
    Internal(String),
}

impl From<String> for DispatcherError {
    fn from(msg: String) -> Self {
        DispatcherError::Internal(msg)
    }
}

impl From<&str> for DispatcherError {
    fn from(msg: &str) -> Self {
        DispatcherError::Internal(msg.to_string())
    }
}
