// SQLite store for daily GPU activity: one row per calendar day keyed by ISO date.
// Uses sqlx for async + connection pooling. Every operation is bounded by a timeout.
//
// The collector writes (upsert after every fold, retention pruning); the API reads.
// WAL mode lets the two processes share the file without blocking each other.

use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::instrument;

use crate::error::StoreError;
use crate::models::DayRecord;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Store operations the aggregator persists through.
pub trait DayStore: Send + Sync {
    /// Insert or replace the row for `record.date` in one atomic statement.
    fn upsert_day(&self, record: &DayRecord)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_day(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Option<DayRecord>, StoreError>> + Send;

    /// Delete every record dated strictly before `cutoff`; returns rows deleted.
    fn prune_before(&self, cutoff: NaiveDate)
    -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Reclaim space after deletes.
    fn vacuum(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

pub struct ActivityRepo {
    pool: SqlitePool,
    timeout: Duration,
}

impl ActivityRepo {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(path: &str, max_pool_size: u32, timeout_ms: u64) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(timeout_ms))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .acquire_timeout(Duration::from_millis(timeout_ms))
            .connect_with(opts)
            .await?;
        Ok(Self {
            pool,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Open an existing database without write access (collector `--show-db`).
    pub async fn connect_read_only(path: &str, timeout_ms: u64) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .read_only(true)
            .busy_timeout(Duration::from_millis(timeout_ms));
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        Ok(Self {
            pool,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Create table and index if they don't exist.
    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS gpu_activity (
                date TEXT PRIMARY KEY,
                minutes INTEGER NOT NULL DEFAULT 0,
                peak_utilization REAL NOT NULL DEFAULT 0,
                avg_utilization REAL NOT NULL DEFAULT 0,
                sampled_minutes INTEGER NOT NULL DEFAULT 0,
                last_updated TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_gpu_activity_date ON gpu_activity(date DESC)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout {
                operation,
                timeout_ms: self.timeout.as_millis() as u64,
            })?
    }

    /// Records with `from <= date <= to`, ascending by date.
    #[instrument(skip(self), fields(repo = "activity", operation = "get_range"))]
    pub async fn get_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DayRecord>, StoreError> {
        self.bounded("get_range", async {
            let rows = sqlx::query(
                "SELECT date, minutes, peak_utilization, avg_utilization, sampled_minutes, last_updated
                 FROM gpu_activity WHERE date >= $1 AND date <= $2 ORDER BY date ASC",
            )
            .bind(from.format(DATE_FORMAT).to_string())
            .bind(to.format(DATE_FORMAT).to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Read)?;
            rows.iter().map(parse_day_row).collect()
        })
        .await
    }

    /// Every stored record, newest first (inspection).
    #[instrument(skip(self), fields(repo = "activity", operation = "get_all"))]
    pub async fn get_all(&self) -> Result<Vec<DayRecord>, StoreError> {
        self.bounded("get_all", async {
            let rows = sqlx::query(
                "SELECT date, minutes, peak_utilization, avg_utilization, sampled_minutes, last_updated
                 FROM gpu_activity ORDER BY date DESC",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Read)?;
            rows.iter().map(parse_day_row).collect()
        })
        .await
    }

    /// Most recent `last_updated` across all rows (aggregation liveness).
    #[instrument(skip(self), fields(repo = "activity", operation = "latest_update"))]
    pub async fn latest_update(&self) -> Result<Option<DateTime<Local>>, StoreError> {
        self.bounded("latest_update", async {
            let row = sqlx::query_scalar::<_, Option<String>>(
                "SELECT last_updated FROM gpu_activity ORDER BY date DESC LIMIT 1",
            )
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Read)?
            .flatten();
            row.map(|s| parse_timestamp("latest", &s)).transpose()
        })
        .await
    }

    /// Cheap round-trip proving the database is reachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.bounded("ping", async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(StoreError::Read)?;
            Ok(())
        })
        .await
    }
}

impl DayStore for ActivityRepo {
    #[instrument(skip(self, record), fields(repo = "activity", operation = "upsert_day", date = %record.date))]
    async fn upsert_day(&self, record: &DayRecord) -> Result<(), StoreError> {
        self.bounded("upsert_day", async {
            sqlx::query(
                r#"
                INSERT INTO gpu_activity
                (date, minutes, peak_utilization, avg_utilization, sampled_minutes, last_updated)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT(date) DO UPDATE SET
                    minutes = excluded.minutes,
                    peak_utilization = excluded.peak_utilization,
                    avg_utilization = excluded.avg_utilization,
                    sampled_minutes = excluded.sampled_minutes,
                    last_updated = excluded.last_updated
                "#,
            )
            .bind(record.date.format(DATE_FORMAT).to_string())
            .bind(record.active_minutes as i64)
            .bind(record.peak_utilization)
            .bind(record.avg_utilization)
            .bind(record.sampled_minutes as i64)
            .bind(record.last_updated.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(StoreError::Write)?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(repo = "activity", operation = "get_day"))]
    async fn get_day(&self, date: NaiveDate) -> Result<Option<DayRecord>, StoreError> {
        self.bounded("get_day", async {
            let row = sqlx::query(
                "SELECT date, minutes, peak_utilization, avg_utilization, sampled_minutes, last_updated
                 FROM gpu_activity WHERE date = $1",
            )
            .bind(date.format(DATE_FORMAT).to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Read)?;
            row.as_ref().map(parse_day_row).transpose()
        })
        .await
    }

    #[instrument(skip(self), fields(repo = "activity", operation = "prune_before"))]
    async fn prune_before(&self, cutoff: NaiveDate) -> Result<u64, StoreError> {
        self.bounded("prune_before", async {
            let r = sqlx::query("DELETE FROM gpu_activity WHERE date < $1")
                .bind(cutoff.format(DATE_FORMAT).to_string())
                .execute(&self.pool)
                .await
                .map_err(StoreError::Write)?;
            Ok(r.rows_affected())
        })
        .await
    }

    #[instrument(skip(self), fields(repo = "activity", operation = "vacuum"))]
    async fn vacuum(&self) -> Result<(), StoreError> {
        self.bounded("vacuum", async {
            sqlx::query("VACUUM")
                .execute(&self.pool)
                .await
                .map_err(StoreError::Write)?;
            Ok(())
        })
        .await
    }
}

fn parse_day_row(row: &SqliteRow) -> Result<DayRecord, StoreError> {
    let date: String = row.try_get("date").map_err(StoreError::Read)?;
    let minutes: i64 = row.try_get("minutes").map_err(StoreError::Read)?;
    let peak_utilization: f64 = row.try_get("peak_utilization").map_err(StoreError::Read)?;
    let avg_utilization: f64 = row.try_get("avg_utilization").map_err(StoreError::Read)?;
    let sampled_minutes: i64 = row.try_get("sampled_minutes").map_err(StoreError::Read)?;
    let last_updated: String = row.try_get("last_updated").map_err(StoreError::Read)?;

    let parsed_date =
        NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| StoreError::Corrupt {
            date: date.clone(),
            reason: e.to_string(),
        })?;
    Ok(DayRecord {
        date: parsed_date,
        active_minutes: minutes.clamp(0, 1440) as u32,
        peak_utilization,
        avg_utilization,
        sampled_minutes: u32::try_from(sampled_minutes).unwrap_or(0),
        last_updated: parse_timestamp(&date, &last_updated)?,
    })
}

fn parse_timestamp(date: &str, s: &str) -> Result<DateTime<Local>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Local))
        .map_err(|e| StoreError::Corrupt {
            date: date.to_string(),
            reason: format!("last_updated {:?}: {}", s, e),
        })
}
