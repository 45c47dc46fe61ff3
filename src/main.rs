/*!
 * Round-Robin Dispatcher - Main Entry Point
 *
 * Usage:
 *   dispatcher [JOB_FILE]                     run a dispatch list
 *   dispatcher generate <COUNT> [SEED] [OUT]  write a random dispatch list
 *
 * Everything else is configured through `RR_*` environment variables.
 */

use miette::{IntoDiagnostic, WrapErr};
use rr_dispatcher::jobs::write_dispatch_list;
use rr_dispatcher::{
    init_tracing, load_jobs, DispatchResult, Dispatcher, DispatcherConfig, FileEventLog,
    GeneratorConfig, OsProcessControl, RunOutcome, RunReport, SimulatedControl,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> miette::Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = DispatcherConfig::from_env()?;

    if args.first().map(String::as_str) == Some("generate") {
        return generate(&args[1..], &config);
    }
    if let Some(job_file) = args.first() {
        config = config.with_job_file(job_file);
    }

    info!("Round-robin dispatcher starting");
    info!(
        job_file = %config.job_file.display(),
        workload = %config.workload.display(),
        tick_ms = config.tick_interval.as_millis() as u64,
        readiness = ?config.readiness,
        simulate = config.simulate,
        "Configuration loaded"
    );

    let jobs = load_jobs(&config.job_file)?.into_jobs();
    if jobs.is_empty() {
        warn!("No jobs to dispatch");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, stopping after the current tick");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let sink = Arc::new(FileEventLog::open(&config.log_path, &config.timeline_path));
    let run_sink = Arc::clone(&sink);
    let run_config = config.clone();

    // The loop paces itself with blocking sleeps
    let outcome = tokio::task::spawn_blocking(move || dispatch(jobs, &run_config, run_sink, shutdown))
        .await
        .into_diagnostic()
        .wrap_err("Dispatcher thread panicked")??;

    match sink.export() {
        Ok(rows) => info!("Timeline written to {} ({} ticks)", sink.timeline_path().display(), rows),
        Err(e) => warn!("Timeline export failed: {}", e),
    }
    sink.flush();

    let report = RunReport::from_outcome(&outcome);
    if let Err(e) = report.write_json(&config.summary_path) {
        warn!("Summary not written: {}", e);
    }
    for line in report.to_table().lines() {
        info!("{}", line);
    }

    if outcome.interrupted {
        warn!("Run interrupted after {} ticks", outcome.stats.ticks);
    } else {
        info!("All jobs finished after {} ticks", outcome.stats.ticks);
    }

    Ok(())
}

fn dispatch(
    jobs: Vec<rr_dispatcher::Job>,
    config: &DispatcherConfig,
    sink: Arc<FileEventLog>,
    shutdown: Arc<AtomicBool>,
) -> DispatchResult<RunOutcome> {
    if config.simulate {
        info!("Simulating workloads, no processes will be spawned");
        let mut dispatcher = Dispatcher::new(jobs, SimulatedControl::new(), sink)?
            .with_config(config)
            .with_shutdown(shutdown);
        return Ok(dispatcher.run());
    }

    let control = OsProcessControl::from_config(config)?;
    let mut dispatcher = Dispatcher::new(jobs, control, sink)?
        .with_config(config)
        .with_shutdown(shutdown);
    Ok(dispatcher.run())
}

fn generate(args: &[String], config: &DispatcherConfig) -> miette::Result<()> {
    let count = match args.first() {
        Some(value) => value
            .parse::<usize>()
            .into_diagnostic()
            .wrap_err_with(|| format!("Invalid job count '{}'", value))?,
        None => GeneratorConfig::default().count,
    };

    let mut generator = GeneratorConfig::new(count);
    if let Some(value) = args.get(1) {
        let seed = value
            .parse::<u64>()
            .into_diagnostic()
            .wrap_err_with(|| format!("Invalid seed '{}'", value))?;
        generator = generator.with_seed(seed);
    }

    let out = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.job_file.clone());
    write_dispatch_list(&out, &generator)?;
    Ok(())
}
