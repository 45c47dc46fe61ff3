/*!
 * Dispatcher Configuration
 *
 * Paths, pacing and workload settings. Every field can be overridden from
 * the environment (`RR_*` variables); the job file can also be given as the
 * first command-line argument.
 */

use crate::process::ReadinessMode;
use miette::Diagnostic;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    #[diagnostic(
        code(config::invalid_value),
        help("Numeric settings take a non-negative integer number of milliseconds.")
    )]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid readiness mode: '{0}'")]
    #[diagnostic(
        code(config::invalid_readiness),
        help("Use 'handshake', 'none', or 'delay:<ms>'.")
    )]
    InvalidReadiness(String),
}

pub const ENV_JOB_FILE: &str = "RR_JOB_FILE";
pub const ENV_LOG_PATH: &str = "RR_LOG_PATH";
pub const ENV_TIMELINE_PATH: &str = "RR_TIMELINE_PATH";
pub const ENV_SUMMARY_PATH: &str = "RR_SUMMARY_PATH";
pub const ENV_TICK_MS: &str = "RR_TICK_MS";
pub const ENV_WORKLOAD: &str = "RR_WORKLOAD";
pub const ENV_READINESS: &str = "RR_READINESS";
pub const ENV_READY_TIMEOUT_MS: &str = "RR_READY_TIMEOUT_MS";
pub const ENV_SIMULATE: &str = "RR_SIMULATE";

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Dispatch list to load (default: data/dispatchlist.txt)
    pub job_file: PathBuf,

    /// Human-readable audit log (default: data/log.txt)
    pub log_path: PathBuf,

    /// Per-tick timeline CSV (default: data/gantt.csv)
    pub timeline_path: PathBuf,

    /// JSON run summary (default: data/results.json)
    pub summary_path: PathBuf,

    /// Wall-clock pacing per tick (default: 1s)
    pub tick_interval: Duration,

    /// Executable spawned for every job
    pub workload: PathBuf,

    /// How `start` waits for a freshly spawned workload
    pub readiness: ReadinessMode,

    /// Upper bound for the readiness handshake (default: 2s)
    pub readiness_timeout: Duration,

    /// Drive jobs through the simulated control instead of real processes
    pub simulate: bool,
}

impl DispatcherConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self {
            job_file: PathBuf::from("data/dispatchlist.txt"),
            log_path: PathBuf::from("data/log.txt"),
            timeline_path: PathBuf::from("data/gantt.csv"),
            summary_path: PathBuf::from("data/results.json"),
            tick_interval: Duration::from_secs(1),
            workload: default_workload(),
            readiness: ReadinessMode::Handshake,
            readiness_timeout: Duration::from_secs(2),
            simulate: false,
        }
    }

    /// Zero pacing and no readiness wait (tests, simulations)
    pub fn fast() -> Self {
        Self {
            tick_interval: Duration::ZERO,
            readiness: ReadinessMode::None,
            ..Self::new()
        }
    }

    /// Defaults overridden by `RR_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `RR_*` key
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(path) = lookup(ENV_JOB_FILE) {
            config.job_file = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_LOG_PATH) {
            config.log_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_TIMELINE_PATH) {
            config.timeline_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_SUMMARY_PATH) {
            config.summary_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_WORKLOAD) {
            config.workload = PathBuf::from(path);
        }
        if let Some(value) = lookup(ENV_TICK_MS) {
            config.tick_interval = parse_millis(ENV_TICK_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_READY_TIMEOUT_MS) {
            config.readiness_timeout = parse_millis(ENV_READY_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_READINESS) {
            config.readiness = value.parse()?;
        }
        if let Some(value) = lookup(ENV_SIMULATE) {
            config.simulate = matches!(value.trim(), "1" | "true" | "yes");
        }

        Ok(config)
    }

    /// Override the job file (first CLI argument)
    pub fn with_job_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.job_file = path.into();
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_workload(mut self, workload: impl Into<PathBuf>) -> Self {
        self.workload = workload.into();
        self
    }

    pub fn with_readiness(mut self, readiness: ReadinessMode) -> Self {
        self.readiness = readiness;
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_millis(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

/// `cpu-burner` installed next to the running executable, or looked up on PATH
fn default_workload() -> PathBuf {
    std::env::current_exe()
        .ok()
        .map(|exe| exe.with_file_name("cpu-burner"))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from("cpu-burner"))
}
