//! File-backed site store: one versioned JSON document holding every site
//! record and its last known health.
//!
//! Writes go to a sibling temp file which is then renamed over the original,
//! so a crash mid-write leaves the previous document intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::types::{MonitoredSite, SiteHealth, SiteId, SiteStore};
use crate::error::{Result, VigilError};
use crate::health::HealthStatus;

/// Document format version
pub const DOCUMENT_VERSION: u32 = 1;

/// On-disk document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDocument {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sites: Vec<SiteRecord>,
}

impl Default for SiteDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            updated_at: None,
            sites: Vec::new(),
        }
    }
}

/// One website entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    pub id: SiteId,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<HealthStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_health_check: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_expiration_days: Option<i64>,
}

impl SiteRecord {
    pub fn health(&self) -> Option<SiteHealth> {
        Some(SiteHealth {
            status: self.status?,
            checked_at: self.last_health_check?,
            days_until_expiry: self.ssl_expiration_days,
        })
    }
}

impl From<&SiteRecord> for MonitoredSite {
    fn from(record: &SiteRecord) -> Self {
        MonitoredSite {
            id: record.id.clone(),
            url: record.url.clone(),
            name: record.name.clone(),
        }
    }
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Read-modify-write of the whole document must not interleave
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the document
    pub async fn load(&self) -> Result<SiteDocument> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let document: SiteDocument = serde_json::from_str(&content)?;

        if document.version != DOCUMENT_VERSION {
            return Err(VigilError::Other(format!(
                "unsupported site document version {} (expected {})",
                document.version, DOCUMENT_VERSION
            )));
        }

        Ok(document)
    }

    /// Atomically replace the document on disk
    pub async fn save(&self, document: &SiteDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), sites = document.sites.len(), "Saved site document");
        Ok(())
    }

    async fn record_health(
        &self,
        site_id: &SiteId,
        status: HealthStatus,
        checked_at: DateTime<Utc>,
        days_until_expiry: Option<i64>,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.load().await?;
        let record = document
            .sites
            .iter_mut()
            .find(|r| &r.id == site_id)
            .ok_or_else(|| VigilError::SiteNotFound(site_id.to_string()))?;

        record.status = Some(status);
        record.last_health_check = Some(checked_at);
        record.ssl_expiration_days = days_until_expiry;
        document.updated_at = Some(Utc::now());

        self.save(&document).await
    }
}

#[async_trait]
impl SiteStore for JsonFileStore {
    async fn list_monitored_sites(&self) -> Result<Vec<MonitoredSite>> {
        let document = self.load().await.map_err(|e| {
            VigilError::Persistence(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(document.sites.iter().map(MonitoredSite::from).collect())
    }

    async fn update_site_health(
        &self,
        site_id: &SiteId,
        status: HealthStatus,
        checked_at: DateTime<Utc>,
        days_until_expiry: Option<i64>,
    ) -> Result<()> {
        self.record_health(site_id, status, checked_at, days_until_expiry)
            .await
            .map_err(|e| match e {
                VigilError::SiteNotFound(_) => e,
                other => VigilError::PersistenceWrite {
                    site_id: site_id.to_string(),
                    reason: other.to_string(),
                },
            })
    }

    fn requires_serialized_writes(&self) -> bool {
        true
    }
}
