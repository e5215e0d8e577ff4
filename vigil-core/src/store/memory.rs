//! In-memory site store.
//!
//! Useful when embedding the scanner in a process that already holds the site
//! list, and in tests, where individual sites can be made to fail their writes.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use super::types::{MonitoredSite, SiteHealth, SiteId, SiteStore};
use crate::error::{Result, VigilError};
use crate::health::HealthStatus;

#[derive(Debug, Default)]
struct Inner {
    sites: Vec<MonitoredSite>,
    health: HashMap<SiteId, SiteHealth>,
    failing_writes: HashSet<SiteId>,
}

/// Thread-safe store backed by a `RwLock`
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_listing: AtomicBool,
    serialized: bool,
    write_delay: Duration,
    writes_in_flight: AtomicUsize,
    overlapping_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new(sites: Vec<MonitoredSite>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                sites,
                ..Inner::default()
            }),
            ..Self::default()
        }
    }

    /// Ask the scanner for one-at-a-time writes and count any overlap
    pub fn serialized(mut self) -> Self {
        self.serialized = true;
        self
    }

    /// Hold every write for `delay` before applying it
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Make every future write for `site_id` fail
    pub fn fail_writes_for(&self, site_id: impl Into<SiteId>) {
        self.write().failing_writes.insert(site_id.into());
    }

    /// Make `list_monitored_sites` fail
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Last recorded health of a site
    pub fn health(&self, site_id: &SiteId) -> Option<SiteHealth> {
        self.read().health.get(site_id).copied()
    }

    /// Number of sites with recorded health
    pub fn recorded(&self) -> usize {
        self.read().health.len()
    }

    /// How many writes started while another was still running
    pub fn overlapping_writes(&self) -> usize {
        self.overlapping_writes.load(Ordering::SeqCst)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Store read lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Store write lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

#[async_trait]
impl SiteStore for MemoryStore {
    async fn list_monitored_sites(&self) -> Result<Vec<MonitoredSite>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(VigilError::Persistence("store unavailable".to_string()));
        }
        Ok(self.read().sites.clone())
    }

    async fn update_site_health(
        &self,
        site_id: &SiteId,
        status: HealthStatus,
        checked_at: DateTime<Utc>,
        days_until_expiry: Option<i64>,
    ) -> Result<()> {
        if self.writes_in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapping_writes.fetch_add(1, Ordering::SeqCst);
        }
        // Give other writers a chance to overlap if the caller lets them
        tokio::task::yield_now().await;
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }

        let result = {
            let mut inner = self.write();
            if inner.failing_writes.contains(site_id) {
                Err(VigilError::PersistenceWrite {
                    site_id: site_id.to_string(),
                    reason: "write rejected".to_string(),
                })
            } else if !inner.sites.iter().any(|s| &s.id == site_id) {
                Err(VigilError::SiteNotFound(site_id.to_string()))
            } else {
                inner.health.insert(
                    site_id.clone(),
                    SiteHealth {
                        status,
                        checked_at,
                        days_until_expiry,
                    },
                );
                Ok(())
            }
        };

        self.writes_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn requires_serialized_writes(&self) -> bool {
        self.serialized
    }
}
