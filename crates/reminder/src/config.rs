//! Application configuration loaded from a JSON file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::mailer::MailerConfig;
use crate::portal::PortalConfig;

/// Top-level configuration. Every field has a usable default so a partial
/// (or absent) config file still yields a runnable setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Course platform root, no trailing slash
    pub base_url: String,
    /// Seconds between polling cycles
    pub poll_interval_secs: u64,
    /// Seconds to wait before retrying after a failed cycle
    pub cycle_retry_delay_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_secs: u64,
    pub request_timeout_secs: u64,
    pub fetch_concurrency: usize,
    /// CSV roster of enrolled students
    pub roster_path: String,
    /// Directory holding one snapshot file per student
    pub snapshot_dir: String,
    pub error_log_path: String,
    /// Base URL for password-recovery links
    pub recovery_link_base: String,
    /// Log dropped malformed records at WARN instead of DEBUG
    pub report_dropped_records: bool,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub send_email: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://123.121.147.7:88/ve".to_string(),
            poll_interval_secs: 900,
            cycle_retry_delay_secs: 60,
            max_retries: 3,
            retry_backoff_secs: 2,
            request_timeout_secs: 15,
            fetch_concurrency: 4,
            roster_path: "user_data.csv".to_string(),
            snapshot_dir: "snapshots".to_string(),
            error_log_path: "error.log".to_string(),
            recovery_link_base: "https://example.com/reset".to_string(),
            report_dropped_records: true,
            smtp: SmtpConfig::default(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.qq.com".to_string(),
            port: 465,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            send_email: false,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Loads from `REMINDER_CONFIG` or `config.json`. A missing file is
    /// not fatal; defaults apply with a warning.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var("REMINDER_CONFIG").unwrap_or_else(|_| "config.json".to_string());
        let path = Path::new(&path);
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found; using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn portal_config(&self) -> PortalConfig {
        PortalConfig {
            base_url: self.base_url.clone(),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_secs(self.retry_backoff_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            fetch_concurrency: self.fetch_concurrency,
            ..PortalConfig::default()
        }
    }

    pub fn mailer_config(&self) -> MailerConfig {
        MailerConfig {
            host: self.smtp.host.clone(),
            port: self.smtp.port,
            username: self.smtp.username.clone(),
            password: self.smtp.password.clone(),
            from: self.smtp.from.clone(),
            send_email: self.smtp.send_email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_config_backfills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"poll_interval_secs": 300, "smtp": {{"host": "smtp.163.com"}}}}"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.poll_interval_secs, 300);
        assert_eq!(config.smtp.host, "smtp.163.com");
        // Untouched fields keep their defaults.
        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.max_retries, 3);
        assert!(!config.smtp.send_email);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn portal_config_carries_timeouts() {
        let config = AppConfig {
            request_timeout_secs: 30,
            fetch_concurrency: 8,
            ..AppConfig::default()
        };
        let portal = config.portal_config();
        assert_eq!(portal.request_timeout, Duration::from_secs(30));
        assert_eq!(portal.fetch_concurrency, 8);
    }
}
