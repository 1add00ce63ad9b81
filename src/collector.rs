// Collector loop: sampling, minute folds and the retention sweep multiplexed on one task.
// Sampling and folding never interleave mid-operation because a single task drives both;
// the buffer's lock-and-swap additionally keeps a fold boundary exact if they ever did.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::activity_repo::DayStore;
use crate::aggregator::{self, Aggregator};
use crate::gpu_repo::GpuProbe;
use crate::sampler::{self, SampleBuffer};
use crate::schedule;

/// Probe, store, aggregator state and shutdown for the collector.
pub struct CollectorDeps<P, S> {
    pub probe: Arc<P>,
    pub store: Arc<S>,
    pub aggregator: Aggregator,
    pub buffer: SampleBuffer,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// Collector timing.
pub struct CollectorTiming {
    pub sample_interval: Duration,
    /// Capped at `sample_interval` so a hung GPU query never stalls more than one interval.
    pub gpu_timeout: Duration,
    pub fold_interval: Duration,
    /// Align the first fold to the next wall-clock minute (production). Tests run unaligned.
    pub align_folds: bool,
    pub retention_days: u32,
    /// Cron expression for the retention sweep; None runs it only at startup.
    pub retention_schedule: Option<String>,
}

impl CollectorTiming {
    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self {
            sample_interval: Duration::from_secs(config.collector.sample_interval_secs),
            gpu_timeout: Duration::from_millis(config.collector.gpu_timeout_ms),
            fold_interval: schedule::MINUTE,
            align_folds: true,
            retention_days: config.database.retention_days,
            retention_schedule: Some(config.collector.retention_schedule.clone()),
        }
    }
}

/// Spawns the collector. The handle yields the final aggregator state after shutdown.
pub fn spawn<P: GpuProbe, S: DayStore + 'static>(
    deps: CollectorDeps<P, S>,
    timing: CollectorTiming,
) -> tokio::task::JoinHandle<Aggregator> {
    tokio::spawn(run(deps, timing))
}

async fn run<P: GpuProbe, S: DayStore + 'static>(
    deps: CollectorDeps<P, S>,
    timing: CollectorTiming,
) -> Aggregator {
    let CollectorDeps {
        probe,
        store,
        mut aggregator,
        buffer,
        mut shutdown_rx,
    } = deps;
    let gpu_timeout = timing.gpu_timeout.min(timing.sample_interval);

    let mut sample_tick = schedule::every(timing.sample_interval);
    let mut fold_tick = if timing.align_folds {
        schedule::minute_interval(&Local::now())
    } else {
        let mut tick = tokio::time::interval_at(
            tokio::time::Instant::now() + timing.fold_interval,
            timing.fold_interval,
        );
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tick
    };

    let (retention_tx, mut retention_rx) = mpsc::channel::<()>(1);
    if let Some(expr) = timing.retention_schedule.clone() {
        tokio::spawn(schedule::cron_trigger(expr, retention_tx));
    } else {
        drop(retention_tx);
    }

    sweep(store.as_ref(), timing.retention_days).await;

    let mut window_start = Local::now();
    info!(
        sample_interval_secs = timing.sample_interval.as_secs_f64(),
        fold_interval_secs = timing.fold_interval.as_secs_f64(),
        date = %aggregator.current().date,
        "collector started"
    );

    loop {
        tokio::select! {
            _ = sample_tick.tick() => {
                sampler::sample_once(&probe, gpu_timeout, &buffer).await;
            }
            _ = fold_tick.tick() => {
                let now = Local::now();
                let samples = buffer.drain();
                aggregator.tick(store.as_ref(), &samples, window_start, now).await;
                window_start = now;
            }
            Some(()) = retention_rx.recv() => {
                sweep(store.as_ref(), timing.retention_days).await;
            }
            _ = &mut shutdown_rx => {
                // Fold the partial minute so its samples are not lost.
                let samples = buffer.drain();
                let report = aggregator
                    .tick(store.as_ref(), &samples, window_start, Local::now())
                    .await;
                debug!(
                    flushed_samples = report.samples,
                    pending_writes = aggregator.pending_writes(),
                    "collector shutting down"
                );
                break;
            }
        }
    }
    aggregator
}

/// Retention sweep followed by VACUUM when anything was removed. Errors are logged, never fatal.
async fn sweep<S: DayStore>(store: &S, retention_days: u32) {
    let today = Local::now().date_naive();
    match aggregator::prune_expired(store, today, retention_days).await {
        Ok(0) => {}
        Ok(_) => {
            if let Err(e) = store.vacuum().await {
                warn!(error = %e, operation = "vacuum", "vacuum failed");
            }
        }
        Err(e) => {
            warn!(
                error = %e,
                operation = "prune_expired",
                "retention sweep failed"
            );
        }
    }
}
