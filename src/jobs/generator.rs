/*!
 * Job Generator
 * Random dispatch lists for testing and benchmarking
 */

use super::loader::{JobRecord, LoadError};
use crate::core::types::{CpuTime, Priority, Tick};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Parameters of a generated dispatch list
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub count: usize,
    /// Arrivals are drawn from `0..=max_arrival`
    pub max_arrival: Tick,
    /// Bursts are drawn from `1..=max_burst`
    pub max_burst: CpuTime,
    /// Written on every record
    pub priority: Priority,
    /// Fixed seed for a reproducible list; entropy otherwise
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: 10,
            max_arrival: 30,
            max_burst: 10,
            priority: 3,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_arrival(mut self, max_arrival: Tick) -> Self {
        self.max_arrival = max_arrival;
        self
    }

    pub fn with_max_burst(mut self, max_burst: CpuTime) -> Self {
        self.max_burst = max_burst.max(1);
        self
    }
}

/// Draw records, sorted by arrival
pub fn generate_records(config: &GeneratorConfig) -> Vec<JobRecord> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut arrivals: Vec<Tick> = (0..config.count)
        .map(|_| rng.gen_range(0..=config.max_arrival))
        .collect();
    arrivals.sort_unstable();

    let max_burst = config.max_burst.max(1);
    arrivals
        .into_iter()
        .map(|arrival| JobRecord {
            arrival,
            priority: config.priority,
            total: rng.gen_range(1..=max_burst),
        })
        .collect()
}

/// Render records in the dispatch-list format
///
/// Each line carries the three fields the loader reads followed by the
/// resource columns `64, 0, 0, 0, 0`, which the loader ignores.
pub fn render_dispatch_list(records: &[JobRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(
            out,
            "{}, {}, {}, 64, 0, 0, 0, 0",
            record.arrival, record.priority, record.total
        );
    }
    out
}

pub fn generate_dispatch_list(config: &GeneratorConfig) -> String {
    render_dispatch_list(&generate_records(config))
}

/// Generate a list and write it to `path`, returning the number of records
pub fn write_dispatch_list(path: &Path, config: &GeneratorConfig) -> Result<usize, LoadError> {
    let write_err = |e: std::io::Error| LoadError::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let records = generate_records(config);
    std::fs::write(path, render_dispatch_list(&records)).map_err(write_err)?;

    info!("Wrote {} jobs to {}", records.len(), path.display());
    Ok(records.len())
}
