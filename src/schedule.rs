// Cadence helpers for the collector loop: wall-clock minute alignment and cron triggers.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Timelike};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::warn;

pub const MINUTE: Duration = Duration::from_secs(60);

/// Time left until the next wall-clock minute boundary (zero when exactly on one).
pub fn until_next_minute<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    let into_minute = Duration::from_secs(now.second() as u64)
        + Duration::from_nanos(now.nanosecond().min(999_999_999) as u64);
    if into_minute.is_zero() {
        Duration::ZERO
    } else {
        MINUTE.saturating_sub(into_minute)
    }
}

/// Interval whose first tick lands on the next minute boundary, then every 60s.
/// Missed ticks are skipped rather than bunched, so a stall never double-folds.
pub fn minute_interval(now: &DateTime<Local>) -> Interval {
    let start = Instant::now() + until_next_minute(now);
    let mut interval = tokio::time::interval_at(start, MINUTE);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Plain fixed-period interval with skip-on-miss.
pub fn every(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Delay until the next fire of `schedule` after `now`, if any.
pub fn until_next_fire(schedule: &cron::Schedule, now: &DateTime<Local>) -> Option<Duration> {
    let next = schedule.after(now).next()?;
    Some((next - *now).to_std().unwrap_or(Duration::from_secs(1)))
}

/// Sends a message on `tx` at each fire of the cron expression (local time).
/// Exits when the receiver is dropped.
pub async fn cron_trigger(expr: String, tx: tokio::sync::mpsc::Sender<()>) {
    let Ok(schedule) = cron::Schedule::from_str(&expr) else {
        warn!(cron = %expr, "invalid cron expression; trigger will not fire");
        return;
    };
    loop {
        match until_next_fire(&schedule, &Local::now()) {
            Some(delay) => {
                tokio::time::sleep(delay).await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
            None => tokio::time::sleep(Duration::from_secs(3600)).await,
        }
    }
}
