use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::SiteTarget;

/// Why a certificate could not be read
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CertificateFailure {
    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    #[error("no certificate presented")]
    NoCertificate,

    #[error("certificate unreadable: {0}")]
    Unreadable(String),
}

/// Outcome of one certificate inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CertificateResult {
    /// The peer certificate was read
    Inspected {
        not_after: DateTime<Utc>,
        /// Negative once the certificate has expired
        days_until_expiry: i64,
    },
    /// A check was attempted and failed
    Failed { failure: CertificateFailure },
    /// The target is plain http, so there is nothing to inspect
    Skipped,
}

impl CertificateResult {
    pub fn days_until_expiry(&self) -> Option<i64> {
        match self {
            CertificateResult::Inspected {
                days_until_expiry, ..
            } => Some(*days_until_expiry),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&CertificateFailure> {
        match self {
            CertificateResult::Failed { failure } => Some(failure),
            _ => None,
        }
    }
}

/// Source of certificate results for a site
#[async_trait]
pub trait CertificateInspect: Send + Sync {
    async fn inspect(&self, target: &SiteTarget) -> CertificateResult;
}
