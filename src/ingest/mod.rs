//! Ingestion module for catalog product pages
//!
//! This module contains the core ingestion logic, including:
//! - HTTP fetching with bounded retries
//! - Page URL construction
//! - Payload normalization into records
//! - Pagination with failure thresholds and last-page discovery

mod fetcher;
mod ingestor;
mod parser;
mod record;
mod request;

pub use fetcher::{
    build_http_client, AttemptOutcome, FetchAttempt, FetchFailure, HttpFetcher, JsonFetcher,
};
pub use ingestor::{IngestOptions, IngestRun, PageIngestor, StopReason};
pub use parser::parse_products;
pub use record::Record;
pub use request::ApiRequest;
