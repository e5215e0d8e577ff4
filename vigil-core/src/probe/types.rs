use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a probe produced no HTTP status
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeFailure {
    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("TLS handshake failed: {0}")]
    Tls(String),
}

impl ProbeFailure {
    /// Transient failures may succeed on a later attempt; TLS failures won't.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ProbeFailure::Tls(_))
    }
}

/// Outcome of one HTTP probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeResult {
    /// The server answered; the code may be anything from 100 to 599
    Responded { status: u16 },
    /// No response status was obtained
    Failed { failure: ProbeFailure },
}

impl ProbeResult {
    pub fn responded(status: u16) -> Self {
        ProbeResult::Responded { status }
    }

    pub fn failed(failure: ProbeFailure) -> Self {
        ProbeResult::Failed { failure }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProbeResult::Responded { status } => Some(*status),
            ProbeResult::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&ProbeFailure> {
        match self {
            ProbeResult::Responded { .. } => None,
            ProbeResult::Failed { failure } => Some(failure),
        }
    }
}

/// Anything that can answer "what status does this URL return?"
///
/// Implementations must bound their own running time and must report every
/// failure as a [`ProbeResult::Failed`] value rather than panicking.
#[async_trait]
pub trait SiteProbe: Send + Sync {
    async fn probe(&self, url: &Url) -> ProbeResult;
}
