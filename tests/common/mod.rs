// Shared test helpers: in-memory store, fixed probes, record builders

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use gpu_activity::activity_repo::DayStore;
use gpu_activity::error::{SampleError, StoreError};
use gpu_activity::gpu_repo::GpuProbe;
use gpu_activity::models::DayRecord;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Local time on `date` at hh:mm (midday-ish values avoid DST gaps).
pub fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Local> {
    Local
        .from_local_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
        .earliest()
        .unwrap()
}

pub fn record(date: NaiveDate, active_minutes: u32) -> DayRecord {
    DayRecord {
        date,
        active_minutes,
        peak_utilization: if active_minutes > 0 { 80.0 } else { 0.0 },
        avg_utilization: if active_minutes > 0 { 25.0 } else { 0.0 },
        sampled_minutes: active_minutes,
        last_updated: at(date, 12, 0),
    }
}

/// DayStore backed by a map. `set_failing(true)` makes every operation but vacuum time out.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<NaiveDate, DayRecord>>,
    failing: AtomicBool,
    pub writes: AtomicUsize,
    pub vacuums: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = DayRecord>) -> Self {
        let store = Self::new();
        {
            let mut rows = store.rows.lock().unwrap();
            for r in records {
                rows.insert(r.date, r);
            }
        }
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, date: NaiveDate) -> Option<DayRecord> {
        self.rows.lock().unwrap().get(&date).cloned()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.lock().unwrap().keys().copied().collect()
    }

    fn check(&self, operation: &'static str) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout {
                operation,
                timeout_ms: 0,
            });
        }
        Ok(())
    }
}

impl DayStore for MemoryStore {
    async fn upsert_day(&self, record: &DayRecord) -> Result<(), StoreError> {
        self.check("upsert_day")?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .insert(record.date, record.clone());
        Ok(())
    }

    async fn get_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, StoreError> {
        self.check("get_day")?;
        Ok(self.get(date))
    }

    async fn prune_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        self.check("prune_before")?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|d, _| *d >= cutoff);
        Ok((before - rows.len()) as u64)
    }

    async fn vacuum(&self) -> Result<(), StoreError> {
        self.vacuums.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Always reports the same utilization.
pub struct ConstProbe(pub f64);

impl GpuProbe for ConstProbe {
    fn utilization(&self) -> Result<f64, SampleError> {
        Ok(self.0)
    }
}

/// Every query fails, like a host without the driver.
pub struct BrokenProbe;

impl GpuProbe for BrokenProbe {
    fn utilization(&self) -> Result<f64, SampleError> {
        Err(SampleError::Query("nvidia-smi: not found".into()))
    }
}

/// Blocks past any reasonable sample timeout.
pub struct HungProbe(pub std::time::Duration);

impl GpuProbe for HungProbe {
    fn utilization(&self) -> Result<f64, SampleError> {
        std::thread::sleep(self.0);
        Ok(100.0)
    }
}
