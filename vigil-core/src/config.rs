//! Configuration file loading and validation
//!
//! A `vigil.toml` file is optional and every key in it is optional; missing
//! values fall back to the built-in defaults. Command line flags are applied on
//! top by the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, VigilError};
use crate::health::DEFAULT_EXPIRY_WINDOW_DAYS;
use crate::retry::RetryPolicy;
use crate::scanner::{ScanOptions, DEFAULT_CONCURRENCY};

pub const DEFAULT_CONFIG_FILE: &str = "vigil.toml";
pub const DEFAULT_SITES_FILE: &str = "sites.json";
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;
/// Largest accepted `scan.timeout_secs`
pub const MAX_TIMEOUT_SECS: u64 = 600;
/// Largest accepted `scan.retry_attempts`
pub const MAX_RETRY_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VigilConfig {
    pub scan: ScanSection,
    pub store: StoreSection,
    pub schedule: ScheduleSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSection {
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub expiry_window_days: i64,
    /// Probe attempts per site, including the first
    pub retry_attempts: usize,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            concurrency: DEFAULT_CONCURRENCY,
            expiry_window_days: DEFAULT_EXPIRY_WINDOW_DAYS,
            retry_attempts: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SITES_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleSection {
    pub interval_secs: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl VigilConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: VigilConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VigilError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if given, else `vigil.toml` if it exists, else defaults
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Reject values that would make a scan meaningless
    pub fn validate(&self) -> Result<()> {
        if self.scan.timeout_secs == 0 || self.scan.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(VigilError::Config(format!(
                "scan.timeout_secs must be between 1 and {}",
                MAX_TIMEOUT_SECS
            )));
        }
        if self.scan.concurrency == 0 {
            return Err(VigilError::Config("scan.concurrency must be > 0".into()));
        }
        if self.scan.retry_attempts == 0 || self.scan.retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(VigilError::Config(format!(
                "scan.retry_attempts must be between 1 and {}",
                MAX_RETRY_ATTEMPTS
            )));
        }
        if self.schedule.interval_secs == 0 {
            return Err(VigilError::Config("schedule.interval_secs must be > 0".into()));
        }
        if self.store.path.as_os_str().is_empty() {
            return Err(VigilError::Config("store.path must not be empty".into()));
        }
        Ok(())
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::default()
            .with_timeout(Duration::from_secs(self.scan.timeout_secs))
            .with_concurrency(self.scan.concurrency)
            .with_expiry_window(self.scan.expiry_window_days)
            .with_retry(RetryPolicy::new().with_max_attempts(self.scan.retry_attempts))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_secs)
    }
}
