//! Persistence collaborator interface and the bundled adapters

mod json_file;
mod memory;
mod types;

pub use json_file::{JsonFileStore, SiteDocument, SiteRecord, DOCUMENT_VERSION};
pub use memory::MemoryStore;
pub use types::{MonitoredSite, SiteHealth, SiteId, SiteStore};
