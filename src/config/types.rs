use crate::storage::WriteMode;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Catalog-Ingest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub catalog: CatalogConfig,
    pub output: OutputConfig,
}

/// Upstream catalog API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL; requests go to `{base-url}/{shard}/v2/catalog`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Fixed query parameters sent with every page request
    #[serde(default = "default_params")]
    pub params: BTreeMap<String, String>,

    /// Default request headers
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://catalog.wb.ru/catalog".to_string(),
            params: default_params(),
            headers: default_headers(),
        }
    }
}

fn default_params() -> BTreeMap<String, String> {
    [
        ("ab_testing", "false"),
        ("appType", "1"),
        ("curr", "rub"),
        ("dest", "-3349429"),
        ("hide_dtype", "13"),
        ("lang", "ru"),
        ("sort", "popular"),
        ("spp", "30"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_headers() -> BTreeMap<String, String> {
    [("accept", "*/*"), ("accept-language", "ru,en;q=0.9")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Retry policy of the JSON fetcher
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per URL, including the first
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Lower bound of the jittered delay between attempts (milliseconds)
    #[serde(rename = "retry-delay-min-ms", default = "default_retry_delay_min_ms")]
    pub retry_delay_min_ms: u64,

    /// Upper bound of the jittered delay between attempts (milliseconds)
    #[serde(rename = "retry-delay-max-ms", default = "default_retry_delay_max_ms")]
    pub retry_delay_max_ms: u64,

    /// Fixed wait after an HTTP 429 (milliseconds)
    #[serde(rename = "rate-limit-cooldown-ms", default = "default_rate_limit_cooldown_ms")]
    pub rate_limit_cooldown_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            retry_delay_min_ms: default_retry_delay_min_ms(),
            retry_delay_max_ms: default_retry_delay_max_ms(),
            rate_limit_cooldown_ms: default_rate_limit_cooldown_ms(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay_min_ms() -> u64 {
    2_000
}

fn default_retry_delay_max_ms() -> u64 {
    5_000
}

fn default_rate_limit_cooldown_ms() -> u64 {
    20_000
}

/// Pagination behavior
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Base delay between pages; the actual wait is jittered up to twice this (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Keep paginating past failed pages
    #[serde(rename = "skip-errors", default = "default_skip_errors")]
    pub skip_errors: bool,

    /// Back-to-back page failures tolerated before skipping past them
    #[serde(rename = "max-consecutive-errors", default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Default page cap; unlimited when absent
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Wait between last-page discovery probes (milliseconds)
    #[serde(rename = "probe-interval-ms", default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Highest page last-page discovery will probe
    #[serde(rename = "max-probe-page", default = "default_max_probe_page")]
    pub max_probe_page: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            skip_errors: default_skip_errors(),
            max_consecutive_errors: default_max_consecutive_errors(),
            max_pages: None,
            probe_interval_ms: default_probe_interval_ms(),
            max_probe_page: default_max_probe_page(),
        }
    }
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_skip_errors() -> bool {
    true
}

fn default_max_consecutive_errors() -> u32 {
    5
}

fn default_probe_interval_ms() -> u64 {
    1_000
}

fn default_max_probe_page() -> u32 {
    500
}

/// Category tree source
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Path to the category tree JSON document
    #[serde(rename = "tree-path")]
    pub tree_path: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Destination table
    #[serde(default = "default_table")]
    pub table: String,

    /// How ingested batches are written
    #[serde(rename = "write-mode", default)]
    pub write_mode: WriteMode,
}

fn default_table() -> String {
    "wb_products".to_string()
}
