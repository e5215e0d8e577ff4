//! HTTP reachability probing
//!
//! A probe answers one question per site: what status line does the URL
//! return, and if none, why not (timeout, DNS, connection or TLS failure).

mod client;
mod types;

pub use client::{HttpProbe, DEFAULT_TIMEOUT};
pub use types::{ProbeFailure, ProbeResult, SiteProbe};
