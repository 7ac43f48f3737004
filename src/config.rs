//! Environment-driven configuration
//!
//! Every knob reads an environment variable (after `.env` has been loaded by
//! the binary) and falls back to a default when it is unset or unparseable.

use chrono::NaiveDate;
use std::env;
use std::time::Duration;

pub const DEFAULT_EASTMONEY_BASE_URL: &str = "https://push2his.eastmoney.com";
pub const DEFAULT_PIPELINE_CRON: &str = "0 0 10 * * Mon-Fri";

/// Deployment environment (`APP_ENV`), `sandbox` when unset
pub fn get_environment() -> String {
    env::var("APP_ENV").unwrap_or_else(|_| "sandbox".to_string())
}

pub fn is_production() -> bool {
    matches!(get_environment().as_str(), "production" | "prod")
}

/// PostgreSQL connection string, if configured
pub fn get_database_url() -> Option<String> {
    env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty())
}

pub fn get_pushbullet_token() -> Option<String> {
    env::var("PUSHBULLET_TOKEN").ok().filter(|v| !v.trim().is_empty())
}

/// Securities to register on startup (`SECURITIES`, comma separated secids)
pub fn get_securities() -> Vec<String> {
    env::var("SECURITIES")
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

pub fn get_port() -> u16 {
    parse_env("PORT").unwrap_or(8080)
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Settings for one ingestion run and its schedule
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of concurrent fetch workers
    pub concurrency: usize,
    /// Sleep each worker takes before every fetch
    pub request_delay: Duration,
    /// Upper bound on a single fetch
    pub request_timeout: Duration,
    /// Securities with KDJ J at or below this value are screened in
    pub kdj_threshold: f64,
    /// First date requested for a security that has no stored candles
    pub bootstrap_start: NaiveDate,
    pub eastmoney_base_url: String,
    pub cron: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            request_delay: Duration::from_secs(3),
            request_timeout: Duration::from_secs(10),
            kdj_threshold: 30.0,
            bootstrap_start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            eastmoney_base_url: DEFAULT_EASTMONEY_BASE_URL.to_string(),
            cron: DEFAULT_PIPELINE_CRON.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bootstrap_start = env::var("BOOTSTRAP_START_DATE")
            .ok()
            .and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
            .unwrap_or(defaults.bootstrap_start);

        Self {
            concurrency: parse_env::<usize>("FETCH_CONCURRENCY")
                .unwrap_or(defaults.concurrency)
                .max(1),
            request_delay: parse_env("FETCH_DELAY_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_delay),
            request_timeout: parse_env("FETCH_TIMEOUT_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            kdj_threshold: parse_env("SCREEN_KDJ_THRESHOLD").unwrap_or(defaults.kdj_threshold),
            bootstrap_start,
            eastmoney_base_url: env::var("EASTMONEY_BASE_URL")
                .unwrap_or(defaults.eastmoney_base_url),
            cron: env::var("PIPELINE_CRON").unwrap_or(defaults.cron),
        }
    }
}
