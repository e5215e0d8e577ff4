use super::OutputFormatter;
use crate::health::HealthReport;
use crate::scanner::ScanSummary;
use crate::store::SiteRecord;

pub struct JsonFormatter {
    pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    fn to_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> String {
        let result = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        result.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &HealthReport) -> String {
        self.to_json(report)
    }

    fn format_summary(&self, summary: &ScanSummary) -> String {
        self.to_json(summary)
    }

    fn format_sites(&self, sites: &[SiteRecord]) -> String {
        self.to_json(sites)
    }
}
