//! Health status reduction
//!
//! Turns a probe result plus a certificate result into RUNNING, PROBLEMATIC
//! or STOPPED.

mod evaluator;
mod types;

pub use evaluator::{Finding, HealthEvaluator, DEFAULT_EXPIRY_WINDOW_DAYS};
pub use types::{HealthReport, HealthStatus};
