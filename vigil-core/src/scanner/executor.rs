use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::channel::mpsc;
use futures::future;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::certificate::{
    CertificateFailure, CertificateInspect, CertificateInspector, CertificateResult,
};
use crate::error::Result;
use crate::health::{HealthEvaluator, HealthReport, HealthStatus, DEFAULT_EXPIRY_WINDOW_DAYS};
use crate::probe::{HttpProbe, ProbeFailure, ProbeResult, SiteProbe, DEFAULT_TIMEOUT};
use crate::retry::{RetryExecutor, RetryPolicy, TransientProbeFailures};
use crate::store::{MonitoredSite, SiteId, SiteStore};
use crate::validation::parse_site_url;

pub const DEFAULT_CONCURRENCY: usize = 10;
/// Slack on top of the network timeout before a site's checks are abandoned
const DEADLINE_GRACE: Duration = Duration::from_millis(250);
/// Upper bound on a site's deadline however large the timeout and retry settings
const MAX_DEADLINE: Duration = Duration::from_secs(24 * 60 * 60);

/// Called after each site with (completed, total, site url)
pub type ProgressCallback = Box<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Tunables for one fleet scan; every field has a default
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    pub timeout: Duration,
    pub concurrency: usize,
    pub expiry_window_days: i64,
    pub retry: RetryPolicy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            expiry_window_days: DEFAULT_EXPIRY_WINDOW_DAYS,
            retry: RetryPolicy::no_retry(),
        }
    }
}

impl ScanOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_expiry_window(mut self, days: i64) -> Self {
        self.expiry_window_days = days;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Everything one scan produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reports: BTreeMap<SiteId, HealthReport>,
    /// Sites whose report could not be written back
    pub write_failures: BTreeMap<SiteId, String>,
}

impl ScanSummary {
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn count(&self, status: HealthStatus) -> usize {
        self.reports.values().filter(|r| r.status == status).count()
    }

    pub fn duration(&self) -> chrono::TimeDelta {
        self.finished_at - self.started_at
    }
}

/// Scans every monitored site and writes each result back to the store
pub struct FleetScanner {
    store: Arc<dyn SiteStore>,
    probe: Arc<dyn SiteProbe>,
    inspector: Arc<dyn CertificateInspect>,
    evaluator: HealthEvaluator,
    retry: RetryExecutor<TransientProbeFailures>,
    concurrency: usize,
    deadline: Duration,
    serialize_writes: bool,
}

impl FleetScanner {
    /// Build a scanner that uses the real HTTP probe and TLS inspector
    pub fn new(store: Arc<dyn SiteStore>, options: ScanOptions) -> Result<Self> {
        let probe = HttpProbe::with_timeout(options.timeout)?;
        let inspector = CertificateInspector::new().with_timeout(options.timeout);
        Ok(Self::with_checks(
            store,
            Arc::new(probe),
            Arc::new(inspector),
            options,
        ))
    }

    /// Build a scanner around custom probe and certificate implementations
    pub fn with_checks(
        store: Arc<dyn SiteStore>,
        probe: Arc<dyn SiteProbe>,
        inspector: Arc<dyn CertificateInspect>,
        options: ScanOptions,
    ) -> Self {
        let serialize_writes = store.requires_serialized_writes();
        let deadline = site_deadline(&options);

        Self {
            store,
            probe,
            inspector,
            evaluator: HealthEvaluator::new().with_expiry_window(options.expiry_window_days),
            retry: RetryExecutor::new(options.retry),
            concurrency: options.concurrency.max(1),
            deadline,
            serialize_writes,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Longest a single site's checks may run before they are abandoned
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Scan the whole fleet once
    ///
    /// Fails only if the site list cannot be read. Per-site problems,
    /// including failed writes, are recorded in the summary.
    pub async fn run(&self, progress: Option<ProgressCallback>) -> Result<ScanSummary> {
        let started_at = Utc::now();
        let sites = distinct_sites(self.store.list_monitored_sites().await?);
        let total = sites.len();
        let completed = AtomicUsize::new(0);

        info!(
            total = total,
            concurrency = self.concurrency,
            serialize_writes = self.serialize_writes,
            "Starting fleet scan"
        );

        // Checks and writes run as two stages joined by a channel, so a slow
        // store never holds one of the `concurrency` network slots.
        let (reports_tx, reports_rx) = mpsc::unbounded::<HealthReport>();

        let checks = async move {
            stream::iter(sites)
                .map(|site| async move { self.check_site(&site).await })
                .buffer_unordered(self.concurrency)
                .for_each(|report| {
                    // The receiver outlives this stage
                    let _ = reports_tx.unbounded_send(report);
                    future::ready(())
                })
                .await;
        };

        let record = |report: HealthReport| {
            let completed = &completed;
            let progress = progress.as_ref();
            async move {
                let write_error = self.write_back(&report).await;
                let count = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(progress) = progress {
                    progress(count, total, &report.url);
                }
                (report, write_error)
            }
        };

        let writes = async {
            let outcomes: Vec<(HealthReport, Option<String>)> = if self.serialize_writes {
                reports_rx.then(record).collect().await
            } else {
                reports_rx
                    .map(record)
                    .buffer_unordered(self.concurrency)
                    .collect()
                    .await
            };
            outcomes
        };

        let ((), outcomes) = tokio::join!(checks, writes);

        let mut summary = ScanSummary {
            started_at,
            finished_at: Utc::now(),
            reports: BTreeMap::new(),
            write_failures: BTreeMap::new(),
        };
        for (report, write_error) in outcomes {
            if let Some(error) = write_error {
                summary.write_failures.insert(report.site_id.clone(), error);
            }
            summary.reports.insert(report.site_id.clone(), report);
        }

        info!(
            total = summary.total(),
            running = summary.count(HealthStatus::Running),
            problematic = summary.count(HealthStatus::Problematic),
            stopped = summary.count(HealthStatus::Stopped),
            write_failures = summary.write_failures.len(),
            elapsed_ms = summary.duration().num_milliseconds(),
            "Fleet scan finished"
        );

        Ok(summary)
    }

    /// Probe, inspect and evaluate one site without touching the store
    #[instrument(skip(self, site), fields(site = %site.id, url = %site.url))]
    pub async fn check_site(&self, site: &MonitoredSite) -> HealthReport {
        let target = match parse_site_url(&site.url) {
            Ok(target) => target,
            Err(e) => {
                warn!(error = %e, "Site URL is unusable");
                return HealthReport {
                    site_id: site.id.clone(),
                    url: site.url.clone(),
                    name: site.name.clone(),
                    status: HealthStatus::Stopped,
                    checked_at: Utc::now(),
                    days_until_expiry: None,
                    http_status: None,
                    detail: Some(e.to_string()),
                };
            }
        };

        let probe = async {
            let attempt = self.retry.execute(|| self.probe.probe(&target.url));
            timeout(self.deadline, attempt).await.unwrap_or_else(|_| {
                ProbeResult::failed(ProbeFailure::Timeout {
                    after_ms: self.deadline.as_millis() as u64,
                })
            })
        };
        let certificate = async {
            timeout(self.deadline, self.inspector.inspect(&target))
                .await
                .unwrap_or_else(|_| CertificateResult::Failed {
                    failure: CertificateFailure::Timeout {
                        after_ms: self.deadline.as_millis() as u64,
                    },
                })
        };

        let (probe_result, cert_result) = tokio::join!(probe, certificate);
        let checked_at = Utc::now();

        let finding = self.evaluator.classify(&probe_result, &cert_result);
        let status = finding.status();
        debug!(%status, http_status = ?probe_result.status_code(), days = ?cert_result.days_until_expiry(), "Site evaluated");

        HealthReport {
            site_id: site.id.clone(),
            url: target.url.to_string(),
            name: site.name.clone(),
            status,
            checked_at,
            days_until_expiry: cert_result.days_until_expiry(),
            http_status: probe_result.status_code(),
            detail: finding.describe(),
        }
    }

    /// Write one report to the store, returning the error text on failure
    async fn write_back(&self, report: &HealthReport) -> Option<String> {
        match self
            .store
            .update_site_health(
                &report.site_id,
                report.status,
                report.checked_at,
                report.days_until_expiry,
            )
            .await
        {
            Ok(()) => None,
            Err(e) => {
                warn!(site = %report.site_id, error = %e, "Failed to record site health");
                Some(e.to_string())
            }
        }
    }
}

/// Every attempt may use the full timeout, plus the backoff between them
fn site_deadline(options: &ScanOptions) -> Duration {
    let attempts = u32::try_from(options.retry.max_attempts.max(1)).unwrap_or(u32::MAX);
    options
        .timeout
        .checked_mul(attempts)
        .map(|d| {
            d.saturating_add(options.retry.max_total_delay())
                .saturating_add(DEADLINE_GRACE)
        })
        .unwrap_or(MAX_DEADLINE)
        .min(MAX_DEADLINE)
}

/// Drop repeated site ids, keeping the first entry for each
fn distinct_sites(sites: Vec<MonitoredSite>) -> Vec<MonitoredSite> {
    let mut seen = HashSet::new();
    sites
        .into_iter()
        .filter(|site| {
            let first = seen.insert(site.id.clone());
            if !first {
                warn!(site = %site.id, url = %site.url, "Duplicate site id, skipping entry");
            }
            first
        })
        .collect()
}

/// Scan every site in `store` once with the given options
pub async fn run_fleet_scan(store: Arc<dyn SiteStore>, options: ScanOptions) -> Result<ScanSummary> {
    FleetScanner::new(store, options)?.run(None).await
}
