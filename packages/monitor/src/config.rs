//! Monitor configuration.

use std::num::ParseIntError;

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {source}")]
    Invalid {
        key: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Settings for the dead job monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Seconds a running job may go without an update before it is declared dead.
    pub stop_job_after_seconds: u64,
    /// Seconds between two sweeps.
    pub sweep_interval_secs: u64,
    /// Maximum number of stale jobs processed at the same time.
    pub sweep_concurrency: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stop_job_after_seconds: 20,
            sweep_interval_secs: 10 * 60,
            sweep_concurrency: 4,
        }
    }
}

impl MonitorConfig {
    pub const STOP_JOB_AFTER_SECONDS: &'static str = "STOP_JOB_AFTER_SECONDS";
    pub const SWEEP_INTERVAL_SECS: &'static str = "DEAD_JOB_SWEEP_INTERVAL_SECS";
    pub const SWEEP_CONCURRENCY: &'static str = "DEAD_JOB_SWEEP_CONCURRENCY";

    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; missing keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = parse(&lookup, Self::STOP_JOB_AFTER_SECONDS)? {
            config.stop_job_after_seconds = value;
        }
        if let Some(value) = parse(&lookup, Self::SWEEP_INTERVAL_SECS)? {
            config.sweep_interval_secs = value;
        }
        if let Some(value) = parse(&lookup, Self::SWEEP_CONCURRENCY)? {
            config.sweep_concurrency = value;
        }
        Ok(config)
    }

    /// Set the staleness threshold.
    pub fn with_stop_job_after_seconds(mut self, seconds: u64) -> Self {
        self.stop_job_after_seconds = seconds;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval_secs(mut self, seconds: u64) -> Self {
        self.sweep_interval_secs = seconds;
        self
    }

    /// Set how many stale jobs are processed concurrently.
    pub fn with_sweep_concurrency(mut self, concurrency: usize) -> Self {
        self.sweep_concurrency = concurrency;
        self
    }

    /// Staleness threshold as a signed duration for timestamp arithmetic.
    pub fn stop_job_after(&self) -> chrono::Duration {
        i64::try_from(self.stop_job_after_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => {
            let parsed = value.trim().parse();
            parsed
                .map(Some)
                .map_err(|source| ConfigError::Invalid { key, value, source })
        }
    }
}
