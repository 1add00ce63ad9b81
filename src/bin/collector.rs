use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use gpu_activity::activity_repo::ActivityRepo;
use gpu_activity::aggregator::{self, Aggregator, DayState};
use gpu_activity::collector::{self, CollectorDeps, CollectorTiming};
use gpu_activity::config::AppConfig;
use gpu_activity::gpu_repo::{GpuProbe, NvidiaSmi};
use gpu_activity::models::MinuteStat;
use gpu_activity::sampler::{self, SampleBuffer};
use gpu_activity::{schedule, telemetry};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Samples GPU utilization and folds it into daily activity records.
///
/// Reads its configuration from CONFIG_FILE (default: config.toml).
#[derive(Debug, Parser)]
#[command(name = "gpu-activity-collector", version, about, long_about = None)]
struct Cli {
    /// Sample for one minute and log the metrics without updating the database.
    #[arg(long, conflicts_with = "show_db")]
    dry_run: bool,

    /// Print the stored day records and exit.
    #[arg(long)]
    show_db: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init();
    let app_config = AppConfig::load()?;

    if cli.show_db {
        return show_db(&app_config).await;
    }

    let probe = Arc::new(NvidiaSmi::new(app_config.collector.gpu_index));
    if cli.dry_run {
        return dry_run(&app_config, probe).await;
    }

    tracing::info!("Initializing database...");
    let repo = Arc::new(
        ActivityRepo::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
            app_config.database.timeout_ms,
        )
        .await?,
    );
    repo.init().await?;

    let aggregator = Aggregator::start(
        repo.as_ref(),
        app_config.collector.activity_threshold,
        Local::now(),
    )
    .await;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = collector::spawn(
        CollectorDeps {
            probe,
            store: repo,
            aggregator,
            buffer: SampleBuffer::new(),
            shutdown_rx,
        },
        CollectorTiming::from_config(&app_config),
    );

    telemetry::shutdown_signal().await;
    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    let aggregator = handle.await?;
    if aggregator.pending_writes() > 0 {
        tracing::warn!(
            pending_writes = aggregator.pending_writes(),
            "exiting with day records not yet persisted"
        );
    }
    Ok(())
}

async fn show_db(config: &AppConfig) -> Result<()> {
    let repo = ActivityRepo::connect_read_only(&config.database.path, config.database.timeout_ms)
        .await?;
    let records = repo.get_all().await?;
    if records.is_empty() {
        println!("Database is empty");
        return Ok(());
    }

    println!("\nGPU Activity Database Contents:");
    println!("{}", "=".repeat(80));
    println!(
        "{:<12} {:<15} {:<10} {:<10} {:<20}",
        "Date", "Active Minutes", "Peak %", "Avg %", "Last Updated"
    );
    println!("{}", "-".repeat(80));
    for r in &records {
        println!(
            "{:<12} {:<15} {:<10.0} {:<10.1} {}",
            r.date.format("%Y-%m-%d").to_string(),
            r.active_minutes,
            r.peak_utilization,
            r.avg_utilization,
            r.last_updated.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("{}", "=".repeat(80));
    println!("Total records: {}", records.len());
    Ok(())
}

async fn dry_run<P: GpuProbe>(config: &AppConfig, probe: Arc<P>) -> Result<()> {
    let interval = Duration::from_secs(config.collector.sample_interval_secs);
    let gpu_timeout = Duration::from_millis(config.collector.gpu_timeout_ms).min(interval);
    let threshold = config.collector.activity_threshold;
    tracing::info!("Dry run - collecting samples for 1 minute...");

    let buffer = SampleBuffer::new();
    let started = tokio::time::Instant::now();
    let minute_start = Local::now();
    let mut tick = schedule::every(interval);
    while started.elapsed() < schedule::MINUTE {
        tick.tick().await;
        sampler::sample_once(&probe, gpu_timeout, &buffer).await;
    }

    let samples = buffer.drain();
    let Some(stat) = MinuteStat::from_samples(&samples, threshold) else {
        tracing::info!("No GPU samples captured (every query failed)");
        return Ok(());
    };
    let mut day = DayState::new(minute_start.date_naive(), minute_start);
    aggregator::fold_minute(&mut day, &samples, threshold, minute_start, Local::now());
    let record = day.snapshot();

    tracing::info!(
        samples = stat.samples,
        active_samples = stat.active_samples,
        "Sample metrics:"
    );
    tracing::info!("Active minute: {}", stat.is_active());
    tracing::info!("Peak utilization: {:.0}%", stat.max);
    tracing::info!("Average utilization: {:.1}%", stat.mean());
    tracing::info!(
        active_minutes = record.active_minutes,
        peak_utilization = record.peak_utilization,
        avg_utilization = record.avg_utilization,
        "Day record after this minute (not persisted)"
    );
    Ok(())
}
