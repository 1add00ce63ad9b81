use std::str::FromStr;

use serde::Deserialize;

use crate::models::{Theme, WeekStart};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// /health reports aggregation as stale when the newest record is older than this.
    #[serde(default = "default_aggregation_stale_secs")]
    pub aggregation_stale_secs: u64,
}

fn default_aggregation_stale_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Upper bound for every store read/write.
    #[serde(default = "default_db_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_max_pool_size() -> u32 {
    4
}

fn default_retention_days() -> u32 {
    365
}

fn default_db_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,
    /// A minute counts as active when its peak sample reaches this utilization (percent).
    #[serde(default = "default_activity_threshold")]
    pub activity_threshold: f64,
    #[serde(default)]
    pub gpu_index: u32,
    #[serde(default = "default_gpu_timeout_ms")]
    pub gpu_timeout_ms: u64,
    /// Cron expression (local time) for the retention sweep, e.g. "0 5 0 * * *" = 00:05 daily.
    #[serde(default = "default_retention_schedule")]
    pub retention_schedule: String,
}

fn default_sample_interval_secs() -> u64 {
    5
}

fn default_activity_threshold() -> f64 {
    1.0
}

fn default_gpu_timeout_ms() -> u64 {
    2000
}

fn default_retention_schedule() -> String {
    "0 5 0 * * *".into()
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: default_sample_interval_secs(),
            activity_threshold: default_activity_threshold(),
            gpu_index: 0,
            gpu_timeout_ms: default_gpu_timeout_ms(),
            retention_schedule: default_retention_schedule(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub default_theme: Theme,
    #[serde(default = "default_weeks")]
    pub default_weeks: u32,
    #[serde(default = "default_max_weeks")]
    pub max_weeks: u32,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub week_start: WeekStart,
    /// Active-minute cut points for levels 1..=4.
    #[serde(default = "default_level_thresholds")]
    pub level_thresholds: [u32; 4],
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_weeks() -> u32 {
    53
}

fn default_max_weeks() -> u32 {
    104
}

fn default_cache_ttl_secs() -> u64 {
    1800
}

fn default_level_thresholds() -> [u32; 4] {
    [1, 15, 60, 180]
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://github.com".into(),
        "https://raw.githubusercontent.com".into(),
    ]
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_theme: Theme::default(),
            default_weeks: default_weeks(),
            max_weeks: default_max_weeks(),
            cache_ttl_secs: default_cache_ttl_secs(),
            week_start: WeekStart::default(),
            level_thresholds: default_level_thresholds(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.server.aggregation_stale_secs > 0,
            "server.aggregation_stale_secs must be > 0, got {}",
            self.server.aggregation_stale_secs
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.database.timeout_ms > 0,
            "database.timeout_ms must be > 0, got {}",
            self.database.timeout_ms
        );
        anyhow::ensure!(
            self.collector.sample_interval_secs > 0 && self.collector.sample_interval_secs <= 60,
            "collector.sample_interval_secs must be between 1 and 60, got {}",
            self.collector.sample_interval_secs
        );
        anyhow::ensure!(
            (0.0..=100.0).contains(&self.collector.activity_threshold),
            "collector.activity_threshold must be between 0 and 100, got {}",
            self.collector.activity_threshold
        );
        anyhow::ensure!(
            self.collector.gpu_timeout_ms > 0,
            "collector.gpu_timeout_ms must be > 0, got {}",
            self.collector.gpu_timeout_ms
        );
        anyhow::ensure!(
            cron::Schedule::from_str(&self.collector.retention_schedule).is_ok(),
            "collector.retention_schedule is not a valid cron expression: {}",
            self.collector.retention_schedule
        );
        anyhow::ensure!(
            (1..=520).contains(&self.graph.max_weeks),
            "graph.max_weeks must be between 1 and 520, got {}",
            self.graph.max_weeks
        );
        anyhow::ensure!(
            (1..=self.graph.max_weeks).contains(&self.graph.default_weeks),
            "graph.default_weeks must be between 1 and graph.max_weeks ({}), got {}",
            self.graph.max_weeks,
            self.graph.default_weeks
        );
        anyhow::ensure!(
            self.graph.cache_ttl_secs > 0,
            "graph.cache_ttl_secs must be > 0, got {}",
            self.graph.cache_ttl_secs
        );
        let t = self.graph.level_thresholds;
        anyhow::ensure!(
            t[0] > 0 && t.windows(2).all(|w| w[0] < w[1]),
            "graph.level_thresholds must be strictly ascending and start above 0, got {:?}",
            t
        );
        Ok(())
    }
}
