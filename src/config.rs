use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;
use reqwest::Url;

use crate::{archive_client::RetryPolicy, sync::SyncSettings};

#[derive(Debug)]
pub struct Config {
    pub archive_base_url: String,
    pub archive_cookie: String,
    pub db_connection_string: String,
    pub bind_addr: String,
    pub sync_throttle_ms: u64,
    pub sync_max_retries: u32,
    pub sync_backoff_base_ms: u64,
    pub sync_backoff_step_ms: u64,
    pub auto_sync_interval_hours: u64,
}

const DEFAULT_ARCHIVE_BASE_URL: &str = "https://archiveofourown.org";
const DEFAULT_DB_CONNECTION_STRING: &str = "sqlite://ao3_tracker.sqlite?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_number<T>(name: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid {name}: {raw}"))
}

fn env_number<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_number(name, &raw),
        _ => Ok(default),
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let defaults = RetryPolicy::default();
        Ok(Config {
            archive_base_url: env_or("ARCHIVE_BASE_URL", DEFAULT_ARCHIVE_BASE_URL),
            archive_cookie: std::env::var("ARCHIVE_COOKIE").unwrap_or_default(),
            db_connection_string: env_or("DB_CONNECTION_STRING", DEFAULT_DB_CONNECTION_STRING),
            bind_addr: env_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            sync_throttle_ms: env_number(
                "SYNC_THROTTLE_MS",
                SyncSettings::default().throttle.as_millis() as u64,
            )?,
            sync_max_retries: env_number("SYNC_MAX_RETRIES", defaults.max_retries)?,
            sync_backoff_base_ms: env_number(
                "SYNC_BACKOFF_BASE_MS",
                defaults.base_delay.as_millis() as u64,
            )?,
            sync_backoff_step_ms: env_number(
                "SYNC_BACKOFF_STEP_MS",
                defaults.step.as_millis() as u64,
            )?,
            auto_sync_interval_hours: env_number("AUTO_SYNC_INTERVAL_HOURS", 24)?,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Err(e) = Url::parse(&self.archive_base_url) {
            return Err(format!(
                "ARCHIVE_BASE_URL is not a valid URL ({}): {e}",
                self.archive_base_url
            ));
        }
        if self.db_connection_string.is_empty() {
            return Err("DB_CONNECTION_STRING is missing".into());
        }
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(format!("BIND_ADDR is not a socket address: {}", self.bind_addr));
        }
        if self.sync_throttle_ms == 0 {
            return Err("SYNC_THROTTLE_MS must be greater than zero".into());
        }
        if self.auto_sync_interval_hours > 0 && self.auto_sync_interval().is_none() {
            return Err(format!(
                "AUTO_SYNC_INTERVAL_HOURS is out of range: {}",
                self.auto_sync_interval_hours
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.sync_max_retries,
            base_delay: Duration::from_millis(self.sync_backoff_base_ms),
            step: Duration::from_millis(self.sync_backoff_step_ms),
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            throttle: Duration::from_millis(self.sync_throttle_ms),
        }
    }

    /// Staleness threshold for auto-sync on unrelated pages; `None` when
    /// disabled or too large to represent.
    pub fn auto_sync_interval(&self) -> Option<chrono::Duration> {
        let hours = i64::try_from(self.auto_sync_interval_hours).ok()?;
        if hours == 0 {
            return None;
        }
        chrono::Duration::try_hours(hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            archive_base_url: DEFAULT_ARCHIVE_BASE_URL.into(),
            archive_cookie: String::new(),
            db_connection_string: DEFAULT_DB_CONNECTION_STRING.into(),
            bind_addr: DEFAULT_BIND_ADDR.into(),
            sync_throttle_ms: 2500,
            sync_max_retries: 5,
            sync_backoff_base_ms: 10_000,
            sync_backoff_step_ms: 5_000,
            auto_sync_interval_hours: 24,
        }
    }

    #[test]
    fn defaults_validate_and_map_to_policies() {
        let c = config();
        assert!(c.validate().is_ok());
        assert_eq!(c.retry_policy(), RetryPolicy::default());
        assert_eq!(c.sync_settings(), SyncSettings::default());
        assert_eq!(c.auto_sync_interval(), Some(chrono::Duration::hours(24)));
    }

    #[test]
    fn rejects_bad_values() {
        let mut c = config();
        c.archive_base_url = "not a url".into();
        assert!(c.validate().unwrap_err().contains("ARCHIVE_BASE_URL"));

        let mut c = config();
        c.sync_throttle_ms = 0;
        assert!(c.validate().unwrap_err().contains("SYNC_THROTTLE_MS"));

        let mut c = config();
        c.bind_addr = "localhost".into();
        assert!(c.validate().is_err());
    }

    #[test]
    fn zero_interval_disables_auto_sync() {
        let mut c = config();
        c.auto_sync_interval_hours = 0;
        assert_eq!(c.auto_sync_interval(), None);
    }

    #[test]
    fn oversized_interval_is_rejected() {
        let mut c = config();
        c.auto_sync_interval_hours = 3_000_000_000_000_000;
        assert_eq!(c.auto_sync_interval(), None);
        assert!(c.validate().unwrap_err().contains("AUTO_SYNC_INTERVAL_HOURS"));

        c.auto_sync_interval_hours = u64::MAX;
        assert_eq!(c.auto_sync_interval(), None);
        assert!(c.validate().is_err());
    }

    #[test]
    fn number_parsing_reports_variable() {
        let err = parse_number::<u64>("SYNC_THROTTLE_MS", "ten").unwrap_err();
        assert!(err.to_string().contains("SYNC_THROTTLE_MS"));
        assert_eq!(parse_number::<u64>("SYNC_THROTTLE_MS", " 250 ").unwrap(), 250);
        assert_eq!(env_number::<u64>("AO3_TRACKER_TEST_UNSET", 7).unwrap(), 7);
    }
}
