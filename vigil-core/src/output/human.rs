use chrono::TimeDelta;
use colored::Colorize;

use super::OutputFormatter;
use crate::colors::{paint_as_status, paint_status, CatppuccinExt};
use crate::health::{HealthReport, HealthStatus, DEFAULT_EXPIRY_WINDOW_DAYS};
use crate::scanner::ScanSummary;
use crate::store::SiteRecord;

fn format_duration(duration: TimeDelta) -> String {
    let millis = duration.num_milliseconds();
    if millis < 1000 {
        return format!("{}ms", millis);
    }
    let total_secs = duration.num_seconds();
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else {
        format!("{}m {}s", total_secs / 60, total_secs % 60)
    }
}

const STATUS_WIDTH: usize = 12;
const ID_WIDTH: usize = 6;

/// How a certificate's remaining lifetime is highlighted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpiryLevel {
    Unknown,
    Expired,
    Expiring,
    Healthy,
}

pub struct HumanFormatter {
    use_colors: bool,
    expiry_window_days: i64,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: true,
            expiry_window_days: DEFAULT_EXPIRY_WINDOW_DAYS,
        }
    }

    /// Highlight certificates with fewer than `days` left, matching the scan's window
    pub fn with_expiry_window(mut self, days: i64) -> Self {
        self.expiry_window_days = days;
        self
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn label(&self, text: &str) -> String {
        if self.use_colors {
            text.sky().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn value(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_white().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.use_colors {
            text.overlay1().to_string()
        } else {
            text.to_string()
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_yellow().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn error(&self, text: &str) -> String {
        if self.use_colors {
            text.ctp_red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn status(&self, status: HealthStatus) -> String {
        if self.use_colors {
            paint_status(status).to_string()
        } else {
            status.to_string()
        }
    }

    /// Status padded to `width` before colouring so columns line up
    fn status_cell(&self, status: HealthStatus, width: usize) -> String {
        let text = format!("{:<width$}", status.as_str(), width = width);
        if self.use_colors {
            paint_as_status(&text, status).to_string()
        } else {
            text
        }
    }

    fn header(&self, text: &str) -> String {
        if self.use_colors {
            format!("\n{}\n{}", text.lavender().bold(), "─".repeat(text.len()).subtext0())
        } else {
            format!("\n{}\n{}", text, "-".repeat(text.len()))
        }
    }

    fn expiry_level(&self, days: Option<i64>) -> ExpiryLevel {
        match days {
            None => ExpiryLevel::Unknown,
            Some(d) if d < 0 => ExpiryLevel::Expired,
            Some(d) if d < self.expiry_window_days => ExpiryLevel::Expiring,
            Some(_) => ExpiryLevel::Healthy,
        }
    }

    fn expiry(&self, days: Option<i64>) -> String {
        let d = days.unwrap_or_default();
        match self.expiry_level(days) {
            ExpiryLevel::Unknown => self.dim("n/a"),
            ExpiryLevel::Expired => self.error(&format!("expired {} days ago", -d)),
            ExpiryLevel::Expiring => self.warning(&format!("{} days", d)),
            ExpiryLevel::Healthy => self.value(&format!("{} days", d)),
        }
    }

    fn site_line(&self, report: &HealthReport) -> String {
        let label = report.name.as_deref().unwrap_or(&report.url);
        let mut line = format!(
            "  {} {}",
            self.status_cell(report.status, STATUS_WIDTH),
            self.value(label)
        );
        if let Some(detail) = &report.detail {
            line.push_str(&format!("  {}", self.dim(detail)));
        }
        line
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_report(&self, report: &HealthReport) -> String {
        let mut output = Vec::new();

        output.push(self.header(&format!("Health: {}", report.url)));
        output.push(format!("  {}: {}", self.label("Status"), self.status(report.status)));

        let http = match report.http_status {
            Some(code) => self.value(&code.to_string()),
            None => self.error("no response"),
        };
        output.push(format!("  {}: {}", self.label("HTTP Status"), http));
        output.push(format!(
            "  {}: {}",
            self.label("Certificate"),
            self.expiry(report.days_until_expiry)
        ));

        if let Some(detail) = &report.detail {
            output.push(format!("  {}: {}", self.label("Reason"), self.value(detail)));
        }

        output.push(format!(
            "  {}: {}",
            self.label("Checked"),
            self.dim(&report.checked_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        ));

        output.join("\n")
    }

    fn format_summary(&self, summary: &ScanSummary) -> String {
        let mut output = Vec::new();

        output.push(self.header(&format!(
            "Fleet scan: {} sites in {}",
            summary.total(),
            format_duration(summary.duration())
        )));

        // Worst first, then by label
        let mut reports: Vec<&HealthReport> = summary.reports.values().collect();
        reports.sort_by(|a, b| {
            b.status
                .cmp(&a.status)
                .then_with(|| a.name.as_deref().unwrap_or(&a.url).cmp(b.name.as_deref().unwrap_or(&b.url)))
        });
        for report in reports {
            output.push(self.site_line(report));
        }

        output.push(String::new());
        output.push(format!(
            "  {} running, {} problematic, {} stopped",
            summary.count(HealthStatus::Running),
            summary.count(HealthStatus::Problematic),
            summary.count(HealthStatus::Stopped)
        ));

        if !summary.write_failures.is_empty() {
            output.push(format!(
                "\n  {}:",
                self.error(&format!("{} results not saved", summary.write_failures.len()))
            ));
            for (site_id, error) in &summary.write_failures {
                output.push(format!("    {} {}", self.value(site_id.as_str()), self.dim(error)));
            }
        }

        output.join("\n")
    }

    fn format_sites(&self, sites: &[SiteRecord]) -> String {
        let mut output = Vec::new();
        output.push(self.header(&format!("Monitored sites ({})", sites.len())));

        for site in sites {
            let status = match site.status {
                Some(status) => self.status_cell(status, STATUS_WIDTH),
                None => self.dim(&format!("{:<width$}", "UNCHECKED", width = STATUS_WIDTH)),
            };
            let checked = site
                .last_health_check
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string());

            output.push(format!(
                "  {} {} {}  {} {}",
                self.dim(&format!("{:<width$}", site.id.as_str(), width = ID_WIDTH)),
                status,
                self.value(site.name.as_deref().unwrap_or(&site.url)),
                self.expiry(site.ssl_expiration_days),
                self.dim(&format!("(checked {})", checked))
            ));
        }

        output.join("\n")
    }
}
