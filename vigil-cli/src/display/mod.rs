mod progress;
mod spinner;

pub use progress::{
    clear_scan_progress_bar, new_scan_progress_bar, set_scan_progress_bar, ProgressWriterFactory,
};
pub use spinner::Spinner;
