// Rendered-SVG cache keyed by (theme, weeks, calendar day) with a fixed TTL.
// Each key has its own async lock, so concurrent misses on the same key render once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::Instant;

use crate::error::ApiError;
use crate::models::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub theme: Theme,
    pub weeks: u32,
    pub day: NaiveDate,
}

#[derive(Debug)]
struct Entry {
    body: String,
    rendered_at: Instant,
}

type Slot = Arc<tokio::sync::Mutex<Option<Entry>>>;

pub struct RenderCache {
    ttl: Duration,
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl RenderCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached body for `key`, or the result of `render` (stored on success only).
    pub async fn get_or_render<F, Fut>(&self, key: CacheKey, render: F) -> Result<String, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ApiError>>,
    {
        let slot = self.slot(key);
        let mut entry = slot.lock().await;
        if let Some(cached) = entry.as_ref()
            && cached.rendered_at.elapsed() < self.ttl
        {
            tracing::debug!(theme = key.theme.as_str(), weeks = key.weeks, "render cache hit");
            return Ok(cached.body.clone());
        }
        let body = render().await?;
        *entry = Some(Entry {
            body: body.clone(),
            rendered_at: Instant::now(),
        });
        Ok(body)
    }

    /// Number of keys holding a rendered body.
    pub fn len(&self) -> usize {
        self.lock_slots()
            .values()
            .filter(|slot| slot.try_lock().map_or(true, |e| e.is_some()))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot for `key`; drops slots from previous days while holding the map lock.
    fn slot(&self, key: CacheKey) -> Slot {
        let mut slots = self.lock_slots();
        slots.retain(|k, _| k.day == key.day);
        slots.entry(key).or_default().clone()
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Slot>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
