use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::health::HealthStatus;

/// Opaque identifier assigned to a site by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SiteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SiteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A website the fleet scanner checks; read-only to the scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredSite {
    pub id: SiteId,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MonitoredSite {
    pub fn new(id: impl Into<SiteId>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name if set, otherwise the URL
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// Last recorded health of a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteHealth {
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
    pub days_until_expiry: Option<i64>,
}

/// Persistence collaborator that owns the site records
///
/// One handle is shared by the whole process and passed to the scanner.
#[async_trait]
pub trait SiteStore: Send + Sync {
    /// All sites to scan. Failing here fails the whole scan.
    async fn list_monitored_sites(&self) -> Result<Vec<MonitoredSite>>;

    /// Record the outcome of one site's scan
    async fn update_site_health(
        &self,
        site_id: &SiteId,
        status: HealthStatus,
        checked_at: DateTime<Utc>,
        days_until_expiry: Option<i64>,
    ) -> Result<()>;

    /// Stores that cannot take concurrent writes return true, and the
    /// scanner then issues writes one at a time
    fn requires_serialized_writes(&self) -> bool {
        false
    }
}
