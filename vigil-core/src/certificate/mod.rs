//! TLS certificate inspection
//!
//! Connects to an https site, reads the peer certificate and reports how many
//! days remain until it expires.

mod der;
mod inspector;
mod types;

pub use der::{parse_not_after, parse_validity, Validity};
pub use inspector::{days_until, CertificateInspector};
pub use types::{CertificateFailure, CertificateInspect, CertificateResult};
