//! Magpie: a job-listing harvest pipeline
//!
//! This crate implements a producer/consumer scraping pipeline: one discovery
//! producer paginates a listing source and feeds a bounded work queue, a fixed
//! pool of extraction workers fetches per-listing detail pages, extracts
//! structured job records, and persists them exactly once into SQLite.

pub mod config;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod storage;

use thiserror::Error;

/// Main error type for Magpie operations
#[derive(Debug, Error)]
pub enum MagpieError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render client error: {0}")]
    Render(#[from] render::RenderError),

    #[error("Store error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Startup failure: {0}")]
    Startup(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Magpie operations
pub type Result<T> = std::result::Result<T, MagpieError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{CancelToken, PipelineSummary, WorkItem};
pub use storage::JobRecord;
