mod human;
mod json;

pub use human::HumanFormatter;
pub use json::JsonFormatter;

use serde::{Deserialize, Serialize};

use crate::health::HealthReport;
use crate::scanner::ScanSummary;
use crate::store::SiteRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" | "pretty" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

pub trait OutputFormatter {
    fn format_report(&self, report: &HealthReport) -> String;
    fn format_summary(&self, summary: &ScanSummary) -> String;
    fn format_sites(&self, sites: &[SiteRecord]) -> String;
}

/// Formatter for `format`; human output highlights certificates inside `expiry_window_days`
pub fn get_formatter(format: OutputFormat, expiry_window_days: i64) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Human => {
            Box::new(HumanFormatter::new().with_expiry_window(expiry_window_days))
        }
        OutputFormat::Json => Box::new(JsonFormatter::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_format() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("pretty".parse::<OutputFormat>(), Ok(OutputFormat::Human));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
