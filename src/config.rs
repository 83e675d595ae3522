//! Runtime configuration, read from the environment (and `.env` via dotenv).

use crate::error::ConfigError;
use crate::models::HistogramSpec;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 3043);
pub const DEFAULT_STALENESS_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub staleness_timeout: chrono::Duration,
    pub sweep_interval: Duration,
    pub histogram: HistogramSpec,
    /// Base URL of the external job runner. Polling is off when unset.
    pub runner_url: Option<String>,
    pub poll_interval: Duration,
    pub log_dir: Option<PathBuf>,
    pub report_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(DEFAULT_BIND_ADDR),
            staleness_timeout: chrono::Duration::seconds(DEFAULT_STALENESS_TIMEOUT_SECS as i64),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            histogram: HistogramSpec::default(),
            runner_url: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            log_dir: None,
            report_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match get("AUDIT_BIND_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: "AUDIT_BIND_ADDR",
                value,
                reason: "expected host:port",
            })?,
            None => SocketAddr::from(DEFAULT_BIND_ADDR),
        };

        let staleness_secs = positive_secs(
            "AUDIT_STALENESS_TIMEOUT_SECS",
            get("AUDIT_STALENESS_TIMEOUT_SECS"),
            DEFAULT_STALENESS_TIMEOUT_SECS,
        )?;
        let sweep_secs = positive_secs(
            "AUDIT_SWEEP_INTERVAL_SECS",
            get("AUDIT_SWEEP_INTERVAL_SECS"),
            DEFAULT_SWEEP_INTERVAL_SECS,
        )?;
        let poll_secs = positive_secs(
            "AUDIT_POLL_INTERVAL_SECS",
            get("AUDIT_POLL_INTERVAL_SECS"),
            DEFAULT_POLL_INTERVAL_SECS,
        )?;

        let histogram = match get("AUDIT_HISTOGRAM_BUCKET_WIDTH") {
            Some(value) => value
                .parse::<u32>()
                .ok()
                .and_then(HistogramSpec::new)
                .ok_or(ConfigError::InvalidValue {
                    key: "AUDIT_HISTOGRAM_BUCKET_WIDTH",
                    value,
                    reason: "expected a width between 1 and 100",
                })?,
            None => HistogramSpec::default(),
        };

        Ok(Self {
            bind_addr,
            staleness_timeout: chrono::Duration::seconds(staleness_secs as i64),
            sweep_interval: Duration::from_secs(sweep_secs),
            histogram,
            runner_url: get("API_URL"),
            poll_interval: Duration::from_secs(poll_secs),
            log_dir: get("AUDIT_LOG_DIR").map(PathBuf::from),
            report_dir: get("AUDIT_REPORT_DIR").map(PathBuf::from),
        })
    }
}

fn positive_secs(
    key: &'static str,
    value: Option<String>,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 && secs <= i64::MAX as u64 / 1000 => Ok(secs),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected a positive number of seconds",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(config_from(&[]).unwrap(), Config::default());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("AUDIT_BIND_ADDR", "127.0.0.1:8080"),
            ("AUDIT_STALENESS_TIMEOUT_SECS", "90"),
            ("AUDIT_HISTOGRAM_BUCKET_WIDTH", "10"),
            ("API_URL", "http://localhost:5000/api"),
            ("AUDIT_REPORT_DIR", "/tmp/reports"),
            ("AUDIT_LOG_DIR", "  "),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.staleness_timeout, chrono::Duration::seconds(90));
        assert_eq!(config.histogram.bucket_count(), 10);
        assert_eq!(config.runner_url.as_deref(), Some("http://localhost:5000/api"));
        assert_eq!(config.report_dir, Some(PathBuf::from("/tmp/reports")));
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config_from(&[("AUDIT_STALENESS_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidValue { key: "AUDIT_STALENESS_TIMEOUT_SECS", .. })
        ));
        assert!(config_from(&[("AUDIT_HISTOGRAM_BUCKET_WIDTH", "150")]).is_err());
        assert!(config_from(&[("AUDIT_POLL_INTERVAL_SECS", "soon")]).is_err());
        assert!(config_from(&[("AUDIT_BIND_ADDR", "localhost")]).is_err());
    }
}
