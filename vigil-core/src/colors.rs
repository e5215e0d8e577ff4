//! Catppuccin-inspired color palette for terminal output.
//!
//! Uses standard ANSI bright colors for maximum terminal compatibility.

use colored::{ColoredString, Colorize};

use crate::health::HealthStatus;

/// Extension trait for applying Catppuccin-inspired colors to strings.
pub trait CatppuccinExt {
    fn ctp_red(&self) -> ColoredString;
    fn peach(&self) -> ColoredString;
    fn ctp_yellow(&self) -> ColoredString;
    fn ctp_green(&self) -> ColoredString;
    fn sky(&self) -> ColoredString;
    fn lavender(&self) -> ColoredString;
    fn ctp_white(&self) -> ColoredString;
    fn subtext0(&self) -> ColoredString;
    fn overlay1(&self) -> ColoredString;
}

impl<S: AsRef<str>> CatppuccinExt for S {
    fn ctp_red(&self) -> ColoredString {
        self.as_ref().bright_red()
    }

    // Peach -> bright yellow (orange-ish)
    fn peach(&self) -> ColoredString {
        self.as_ref().bright_yellow()
    }

    fn ctp_yellow(&self) -> ColoredString {
        self.as_ref().bright_yellow()
    }

    fn ctp_green(&self) -> ColoredString {
        self.as_ref().bright_green()
    }

    fn sky(&self) -> ColoredString {
        self.as_ref().bright_cyan()
    }

    fn lavender(&self) -> ColoredString {
        self.as_ref().bright_purple()
    }

    fn ctp_white(&self) -> ColoredString {
        self.as_ref().bright_white()
    }

    fn subtext0(&self) -> ColoredString {
        self.as_ref().white()
    }

    // Overlay1 -> bright black (gray)
    fn overlay1(&self) -> ColoredString {
        self.as_ref().bright_black()
    }
}

/// Green, yellow or red by status
pub fn paint_status(status: HealthStatus) -> ColoredString {
    paint_as_status(status.as_str(), status)
}

/// Paint arbitrary text in the colour of `status`
pub fn paint_as_status(text: &str, status: HealthStatus) -> ColoredString {
    match status {
        HealthStatus::Running => text.ctp_green().bold(),
        HealthStatus::Problematic => text.peach().bold(),
        HealthStatus::Stopped => text.ctp_red().bold(),
    }
}
