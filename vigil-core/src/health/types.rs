use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::SiteId;

/// Operational status of a site after one scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Running,
    Problematic,
    Stopped,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Running => "RUNNING",
            HealthStatus::Problematic => "PROBLEMATIC",
            HealthStatus::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RUNNING" => Ok(HealthStatus::Running),
            "PROBLEMATIC" => Ok(HealthStatus::Problematic),
            "STOPPED" => Ok(HealthStatus::Stopped),
            _ => Err(format!("Unknown health status: {}", s)),
        }
    }
}

/// Result of one site's evaluation, written back to the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub site_id: SiteId,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
    /// Days left on the TLS certificate; absent when none was read
    pub days_until_expiry: Option<i64>,
    /// HTTP status code returned by the probe, if any
    pub http_status: Option<u16>,
    /// Why the site is not RUNNING
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HealthReport {
    pub fn is_running(&self) -> bool {
        self.status == HealthStatus::Running
    }
}
