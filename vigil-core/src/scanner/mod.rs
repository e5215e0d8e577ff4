//! Fleet-wide scanning
//!
//! Lists every monitored site, checks them with bounded concurrency and writes
//! each site's status back to the store.

mod executor;

pub use executor::{
    run_fleet_scan, FleetScanner, ProgressCallback, ScanOptions, ScanSummary, DEFAULT_CONCURRENCY,
};
