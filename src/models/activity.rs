// Per-day activity record (persisted) and per-minute statistics (derived, never persisted).

use chrono::{DateTime, Local, NaiveDate};

/// One row of `gpu_activity`: the aggregate of every folded minute of a calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayRecord {
    pub date: NaiveDate,
    /// Minutes whose peak sample reached the activity threshold. At most 1440.
    pub active_minutes: u32,
    pub peak_utilization: f64,
    /// Mean of the per-minute means over every folded minute (active or not).
    pub avg_utilization: f64,
    /// Minutes folded so far; weight of `avg_utilization` when resuming.
    pub sampled_minutes: u32,
    pub last_updated: DateTime<Local>,
}

impl DayRecord {
    pub fn empty(date: NaiveDate, now: DateTime<Local>) -> Self {
        Self {
            date,
            active_minutes: 0,
            peak_utilization: 0.0,
            avg_utilization: 0.0,
            sampled_minutes: 0,
            last_updated: now,
        }
    }
}

/// Reduction of one minute of buffered samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinuteStat {
    pub samples: u32,
    pub active_samples: u32,
    pub max: f64,
    pub sum: f64,
}

impl MinuteStat {
    /// None when the minute captured no samples; such a minute folds as a no-op.
    pub fn from_samples(samples: &[f64], threshold: f64) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let active_samples = samples.iter().filter(|&&v| v >= threshold).count() as u32;
        Some(Self {
            samples: samples.len() as u32,
            active_samples,
            max,
            sum: samples.iter().sum(),
        })
    }

    pub fn mean(&self) -> f64 {
        self.sum / self.samples as f64
    }

    /// Active iff max >= threshold, i.e. at least one sample reached it.
    pub fn is_active(&self) -> bool {
        self.active_samples > 0
    }
}
