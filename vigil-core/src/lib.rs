pub mod certificate;
pub mod colors;
pub mod config;
pub mod error;
pub mod health;
pub mod output;
pub mod probe;
pub mod retry;
pub mod scanner;
pub mod store;
pub mod validation;

pub use error::{Result, VigilError};
pub use validation::{parse_site_url, SiteTarget};

pub use certificate::{CertificateFailure, CertificateInspector, CertificateResult};
pub use config::VigilConfig;
pub use health::{HealthEvaluator, HealthReport, HealthStatus, DEFAULT_EXPIRY_WINDOW_DAYS};
pub use probe::{HttpProbe, ProbeFailure, ProbeResult};
pub use retry::RetryPolicy;
pub use scanner::{run_fleet_scan, FleetScanner, ScanOptions, ScanSummary};
pub use store::{JsonFileStore, MemoryStore, MonitoredSite, SiteId, SiteStore};

pub use output::{OutputFormat, OutputFormatter};
