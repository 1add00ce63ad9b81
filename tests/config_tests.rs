// Config loading and validation tests

use gpu_activity::config::AppConfig;
use gpu_activity::models::{Theme, WeekStart};

const VALID_CONFIG: &str = r#"
[server]
port = 8000
host = "0.0.0.0"

[database]
path = "data/gpu_activity.db"
max_pool_size = 4
retention_days = 365

[collector]
sample_interval_secs = 5
activity_threshold = 1.0
retention_schedule = "0 5 0 * * *"

[graph]
default_theme = "dark"
default_weeks = 53
max_weeks = 104
week_start = "monday"
level_thresholds = [1, 15, 60, 180]
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.database.path, "data/gpu_activity.db");
    assert_eq!(config.database.retention_days, 365);
    assert_eq!(config.collector.sample_interval_secs, 5);
    assert_eq!(config.graph.default_theme, Theme::Dark);
    assert_eq!(config.graph.week_start, WeekStart::Monday);
    assert_eq!(config.graph.level_thresholds, [1, 15, 60, 180]);
}

#[test]
fn test_config_optional_sections_take_defaults() {
    let minimal = r#"
[server]
port = 8000
host = "127.0.0.1"

[database]
path = "gpu.db"
"#;
    let config = AppConfig::load_from_str(minimal).expect("load_from_str");
    assert_eq!(config.server.aggregation_stale_secs, 300);
    assert_eq!(config.database.max_pool_size, 4);
    assert_eq!(config.database.timeout_ms, 5000);
    assert_eq!(config.collector.sample_interval_secs, 5);
    assert_eq!(config.collector.activity_threshold, 1.0);
    assert_eq!(config.collector.gpu_index, 0);
    assert_eq!(config.graph.default_theme, Theme::Light);
    assert_eq!(config.graph.default_weeks, 53);
    assert_eq!(config.graph.cache_ttl_secs, 1800);
    assert_eq!(config.graph.week_start, WeekStart::Sunday);
    assert_eq!(
        config.graph.allowed_origins,
        vec!["https://github.com", "https://raw.githubusercontent.com"]
    );
}

#[test]
fn test_config_validation_rejects_invalid_port() {
    let bad = VALID_CONFIG.replace("port = 8000", "port = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("server.port"));
}

#[test]
fn test_config_validation_rejects_empty_db_path() {
    let bad = VALID_CONFIG.replace("path = \"data/gpu_activity.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("database.path"));
}

#[test]
fn test_config_validation_rejects_max_pool_size_zero() {
    let bad = VALID_CONFIG.replace("max_pool_size = 4", "max_pool_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_pool_size"));
}

#[test]
fn test_config_validation_rejects_retention_days_zero() {
    let bad = VALID_CONFIG.replace("retention_days = 365", "retention_days = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("retention_days"));
}

#[test]
fn test_config_validation_rejects_sample_interval_above_a_minute() {
    let bad = VALID_CONFIG.replace("sample_interval_secs = 5", "sample_interval_secs = 61");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("sample_interval_secs"));
}

#[test]
fn test_config_validation_rejects_threshold_out_of_range() {
    let bad = VALID_CONFIG.replace("activity_threshold = 1.0", "activity_threshold = 150.0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("activity_threshold"));
}

#[test]
fn test_config_validation_rejects_bad_cron() {
    let bad = VALID_CONFIG.replace("\"0 5 0 * * *\"", "\"every night\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("retention_schedule"));
}

#[test]
fn test_config_validation_rejects_default_weeks_above_max() {
    let bad = VALID_CONFIG.replace("default_weeks = 53", "default_weeks = 200");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("graph.default_weeks"));
}

#[test]
fn test_config_validation_rejects_unordered_thresholds() {
    let bad = VALID_CONFIG.replace("[1, 15, 60, 180]", "[1, 60, 15, 180]");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("level_thresholds"));

    let zero = VALID_CONFIG.replace("[1, 15, 60, 180]", "[0, 15, 60, 180]");
    let err = AppConfig::load_from_str(&zero).unwrap_err();
    assert!(err.to_string().contains("level_thresholds"));
}

#[test]
fn test_config_rejects_unknown_theme() {
    let bad = VALID_CONFIG.replace("default_theme = \"dark\"", "default_theme = \"purple\"");
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn test_config_rejects_missing_server_section() {
    let bad = VALID_CONFIG.replace("[server]\nport = 8000\nhost = \"0.0.0.0\"\n", "");
    assert!(AppConfig::load_from_str(&bad).is_err());
}
