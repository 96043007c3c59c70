//! Catalog-Ingest: a paginated catalog ingestion engine
//!
//! This crate resolves catalog categories against a static category tree,
//! pulls product pages from the upstream catalog API with bounded retries and
//! adaptive termination, and persists normalized records into a SQLite table
//! that may use either of two historical column layouts.

pub mod category;
pub mod config;
pub mod ingest;
pub mod output;
pub mod resolver;
pub mod service;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Catalog-Ingest operations
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] resolver::ResolveError),

    #[error("Failed to read category tree {path}: {source}")]
    CategoryTree {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed category tree: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
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

    #[error("Invalid header in config: {0}")]
    InvalidHeader(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),
}

/// Result type alias for Catalog-Ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use category::{CategoryIndex, CategoryNode, IndexHandle};
pub use config::Config;
pub use ingest::{HttpFetcher, IngestOptions, IngestRun, JsonFetcher, PageIngestor, Record};
pub use resolver::{CategoryParams, CategoryResolver};
pub use service::{IngestReport, IngestService};
pub use storage::{RecordStore, SqliteRecordStore, WriteMode};
