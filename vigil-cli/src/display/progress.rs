//! Scan progress bar with tracing integration.
//!
//! While a fleet scan shows a progress bar, log lines are printed through the
//! bar so they don't tear the display.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

/// The progress bar of the scan currently running, if any
static SCAN_PROGRESS_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<ProgressBar>> {
    SCAN_PROGRESS_BAR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Build the bar used by `vigil scan` for `total` sites
pub fn new_scan_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");
    progress.set_style(style);
    progress
}

/// Route tracing output through `pb` until cleared
pub fn set_scan_progress_bar(pb: ProgressBar) {
    *slot() = Some(pb);
}

pub fn clear_scan_progress_bar() {
    *slot() = None;
}

fn current_progress_bar() -> Option<ProgressBar> {
    slot().clone()
}

fn emit_line(line: &str) -> std::io::Result<()> {
    match current_progress_bar() {
        Some(pb) => {
            pb.println(line);
            Ok(())
        }
        None => {
            let mut stderr = std::io::stderr();
            stderr.write_all(line.as_bytes())?;
            stderr.write_all(b"\n")
        }
    }
}

/// Line-buffered writer that prints through the active scan progress bar,
/// or straight to stderr when there is none.
pub struct ProgressWriter {
    buffer: Vec<u8>,
}

impl ProgressWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }
}

impl Default for ProgressWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line);
            emit_line(line.trim_end_matches('\n'))?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            let rest = String::from_utf8_lossy(&self.buffer).trim_end().to_string();
            self.buffer.clear();
            if !rest.is_empty() {
                emit_line(&rest)?;
            }
        }
        Ok(())
    }
}

impl Drop for ProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// `MakeWriter` for tracing-subscriber handing out [`ProgressWriter`]s
#[derive(Default)]
pub struct ProgressWriterFactory;

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for ProgressWriterFactory {
    type Writer = ProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressWriter::new()
    }
}
