// Minute-fold state machine: Idle -> Folding -> Persisting -> Idle.
// Each minute's buffered samples reduce to a MinuteStat, fold into the current day,
// and the day's full snapshot is written through to the store. The in-memory DayState
// is the source of truth; a failed write is retried on the next tick.

use chrono::{DateTime, Days, Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::activity_repo::DayStore;
use crate::error::StoreError;
use crate::models::{DayRecord, MinuteStat};

const MINUTES_PER_DAY: u32 = 1440;

/// Where the aggregator is within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Folding,
    Persisting,
}

/// Running aggregate for one calendar day. The average is kept as a sum of
/// per-minute means and only materialized when snapshotting.
#[derive(Debug, Clone, PartialEq)]
pub struct DayState {
    date: NaiveDate,
    active_minutes: u32,
    peak_utilization: f64,
    mean_sum: f64,
    sampled_minutes: u32,
    last_updated: DateTime<Local>,
}

impl DayState {
    pub fn new(date: NaiveDate, now: DateTime<Local>) -> Self {
        Self {
            date,
            active_minutes: 0,
            peak_utilization: 0.0,
            mean_sum: 0.0,
            sampled_minutes: 0,
            last_updated: now,
        }
    }

    /// Continue from a stored record (collector restart within the same day).
    pub fn resume(record: &DayRecord) -> Self {
        Self {
            date: record.date,
            active_minutes: record.active_minutes,
            peak_utilization: record.peak_utilization,
            mean_sum: record.avg_utilization * record.sampled_minutes as f64,
            sampled_minutes: record.sampled_minutes,
            last_updated: record.last_updated,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sampled_minutes(&self) -> u32 {
        self.sampled_minutes
    }

    /// Add a stored record of the same day that this state started without.
    pub fn merge(&mut self, stored: &DayRecord) {
        self.active_minutes = (self.active_minutes + stored.active_minutes).min(MINUTES_PER_DAY);
        self.peak_utilization = self.peak_utilization.max(stored.peak_utilization);
        self.mean_sum += stored.avg_utilization * stored.sampled_minutes as f64;
        self.sampled_minutes += stored.sampled_minutes;
    }

    fn apply(&mut self, stat: &MinuteStat, now: DateTime<Local>) {
        if stat.is_active() && self.active_minutes < MINUTES_PER_DAY {
            self.active_minutes += 1;
        }
        self.peak_utilization = self.peak_utilization.max(stat.max);
        self.mean_sum += stat.mean();
        self.sampled_minutes += 1;
        self.last_updated = now;
    }

    pub fn snapshot(&self) -> DayRecord {
        let avg_utilization = if self.sampled_minutes == 0 {
            0.0
        } else {
            self.mean_sum / self.sampled_minutes as f64
        };
        DayRecord {
            date: self.date,
            active_minutes: self.active_minutes,
            peak_utilization: self.peak_utilization,
            avg_utilization,
            sampled_minutes: self.sampled_minutes,
            last_updated: self.last_updated,
        }
    }
}

/// Result of folding one minute.
#[derive(Debug, Clone, PartialEq)]
pub enum FoldOutcome {
    /// No samples were captured; nothing changed.
    Skipped,
    Folded,
    /// The minute belonged to a new day; `finished` is the prior day's final record.
    RolledOver { finished: DayRecord },
}

/// Fold one minute of samples into `state`. `minute_start` decides which day the
/// minute belongs to; `now` becomes `last_updated`. Only a later day rolls over:
/// a minute dated before the current day (clock stepped back) folds into the current day.
pub fn fold_minute(
    state: &mut DayState,
    samples: &[f64],
    threshold: f64,
    minute_start: DateTime<Local>,
    now: DateTime<Local>,
) -> FoldOutcome {
    let Some(stat) = MinuteStat::from_samples(samples, threshold) else {
        return FoldOutcome::Skipped;
    };
    let day = minute_start.date_naive();
    if day > state.date {
        let finished = state.snapshot();
        *state = DayState::new(day, now);
        state.apply(&stat, now);
        return FoldOutcome::RolledOver { finished };
    }
    state.apply(&stat, now);
    FoldOutcome::Folded
}

/// What one tick did, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub outcome: FoldOutcome,
    pub samples: usize,
    /// The current day's snapshot is durable as of this tick.
    pub persisted: bool,
}

pub struct Aggregator {
    threshold: f64,
    current: DayState,
    /// Finished days whose final write has not succeeded yet, oldest first.
    unsaved: Vec<DayRecord>,
    dirty: bool,
    /// Today's stored record could not be read at startup; merge it before the first write.
    unresumed: bool,
    phase: Phase,
    last_persisted: Option<DateTime<Local>>,
}

impl Aggregator {
    pub fn new(threshold: f64, state: DayState) -> Self {
        Self {
            threshold,
            current: state,
            unsaved: Vec::new(),
            dirty: false,
            unresumed: false,
            phase: Phase::Idle,
            last_persisted: None,
        }
    }

    /// Start from today's stored record if there is one, so a restart never
    /// lowers active_minutes or resets the running average.
    pub async fn resume<S: DayStore>(
        store: &S,
        threshold: f64,
        now: DateTime<Local>,
    ) -> Result<Self, StoreError> {
        let today = now.date_naive();
        let state = match store.get_day(today).await? {
            Some(record) => {
                info!(
                    date = %today,
                    active_minutes = record.active_minutes,
                    sampled_minutes = record.sampled_minutes,
                    "resuming day record"
                );
                DayState::resume(&record)
            }
            None => DayState::new(today, now),
        };
        Ok(Self::new(threshold, state))
    }

    /// Like [`Aggregator::resume`], but a store outage does not stop the collector:
    /// folding starts from an empty day and the stored record is merged in once the
    /// store answers. Nothing is written before that, so a stored day is never overwritten
    /// with lower counts.
    pub async fn start<S: DayStore>(store: &S, threshold: f64, now: DateTime<Local>) -> Self {
        match Self::resume(store, threshold, now).await {
            Ok(aggregator) => aggregator,
            Err(e) => {
                warn!(
                    error = %e,
                    operation = "resume",
                    "could not read today's record; will merge it once the store is reachable"
                );
                let mut aggregator = Self::new(threshold, DayState::new(now.date_naive(), now));
                aggregator.unresumed = true;
                aggregator
            }
        }
    }

    /// False until the stored record for the starting day has been read.
    pub fn is_resumed(&self) -> bool {
        !self.unresumed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current(&self) -> DayRecord {
        self.current.snapshot()
    }

    pub fn last_persisted(&self) -> Option<DateTime<Local>> {
        self.last_persisted
    }

    /// Records not yet durable (finished days plus the current day when dirty).
    pub fn pending_writes(&self) -> usize {
        self.unsaved.len() + usize::from(self.dirty)
    }

    /// One full cycle for the minute starting at `minute_start`.
    pub async fn tick<S: DayStore>(
        &mut self,
        store: &S,
        samples: &[f64],
        minute_start: DateTime<Local>,
        now: DateTime<Local>,
    ) -> TickReport {
        self.phase = Phase::Folding;
        let outcome = fold_minute(
            &mut self.current,
            samples,
            self.threshold,
            minute_start,
            now,
        );
        match &outcome {
            FoldOutcome::Skipped => {
                debug!(operation = "fold", "no samples this minute; fold skipped");
            }
            FoldOutcome::Folded => {
                self.dirty = true;
            }
            FoldOutcome::RolledOver { finished } => {
                info!(
                    finished_date = %finished.date,
                    active_minutes = finished.active_minutes,
                    peak_utilization = finished.peak_utilization,
                    avg_utilization = finished.avg_utilization,
                    "day rollover"
                );
                // The finished day needs one more write only if its last fold was not persisted.
                if self.dirty {
                    self.unsaved.push(finished.clone());
                }
                self.dirty = true;
            }
        }

        self.phase = Phase::Persisting;
        let persisted = self.persist(store, now).await;
        self.phase = Phase::Idle;

        debug!(
            operation = "fold",
            samples = samples.len(),
            date = %self.current.date(),
            sampled_minutes = self.current.sampled_minutes(),
            persisted,
            "minute folded"
        );
        TickReport {
            outcome,
            samples: samples.len(),
            persisted,
        }
    }

    /// Write every pending record. Returns true when nothing is left pending.
    async fn persist<S: DayStore>(&mut self, store: &S, now: DateTime<Local>) -> bool {
        if self.unresumed && !self.reconcile(store).await {
            return false;
        }
        while !self.unsaved.is_empty() {
            let record = &self.unsaved[0];
            if let Err(e) = store.upsert_day(record).await {
                warn!(
                    error = %e,
                    operation = "upsert_day",
                    date = %record.date,
                    "store write failed; will retry next minute"
                );
                return false;
            }
            self.unsaved.remove(0);
        }
        if !self.dirty {
            return true;
        }
        match store.upsert_day(&self.current.snapshot()).await {
            Ok(()) => {
                self.dirty = false;
                self.last_persisted = Some(now);
                true
            }
            Err(e) => {
                warn!(
                    error = %e,
                    operation = "upsert_day",
                    date = %self.current.date(),
                    "store write failed; will retry next minute"
                );
                false
            }
        }
    }

    /// Merge stored rows into every record folded since a failed resume.
    async fn reconcile<S: DayStore>(&mut self, store: &S) -> bool {
        let mut merged = Vec::with_capacity(self.unsaved.len());
        for record in &self.unsaved {
            match store.get_day(record.date).await {
                Ok(Some(stored)) => {
                    let mut state = DayState::resume(record);
                    state.merge(&stored);
                    merged.push(state.snapshot());
                }
                Ok(None) => merged.push(record.clone()),
                Err(e) => {
                    warn!(error = %e, operation = "resume", "store still unreachable");
                    return false;
                }
            }
        }
        match store.get_day(self.current.date()).await {
            Ok(Some(stored)) => {
                info!(
                    date = %stored.date,
                    active_minutes = stored.active_minutes,
                    "merged stored day record after store recovery"
                );
                self.current.merge(&stored);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, operation = "resume", "store still unreachable");
                return false;
            }
        }
        self.unsaved = merged;
        self.unresumed = false;
        true
    }
}

/// First date kept by a sweep with the given horizon.
pub fn retention_cutoff(today: NaiveDate, retention_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(retention_days as u64))
        .unwrap_or(NaiveDate::MIN)
}

/// Delete records older than `today - retention_days`. Idempotent.
pub async fn prune_expired<S: DayStore>(
    store: &S,
    today: NaiveDate,
    retention_days: u32,
) -> Result<u64, StoreError> {
    let cutoff = retention_cutoff(today, retention_days);
    let deleted = store.prune_before(cutoff).await?;
    if deleted > 0 {
        info!(deleted, cutoff = %cutoff, "retention sweep removed old day records");
    } else {
        debug!(cutoff = %cutoff, "retention sweep: nothing to remove");
    }
    Ok(deleted)
}
