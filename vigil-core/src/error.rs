use thiserror::Error;

#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Invalid site URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("Failed to list monitored sites: {0}")]
    Persistence(String),

    #[error("Failed to record health for site {site_id}: {reason}")]
    PersistenceWrite { site_id: String, reason: String },

    #[error("Unknown site: {0}")]
    SiteNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing failed: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, VigilError>;
