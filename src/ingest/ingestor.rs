use crate::config::{ApiConfig, IngestConfig};
use crate::ingest::fetcher::JsonFetcher;
use crate::ingest::parser::parse_products;
use crate::ingest::record::Record;
use crate::ingest::request::ApiRequest;
use rand::Rng;
use std::time::Duration;

/// Pagination policy of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// Base inter-page delay; the actual wait is jittered up to twice this
    pub page_delay: Duration,

    /// Keep paginating past failed pages
    pub skip_errors: bool,

    /// Back-to-back failures tolerated before the counter resets
    pub max_consecutive_errors: u32,

    /// Highest page to request
    pub max_pages: Option<u32>,
}

impl IngestOptions {
    /// Options taken from the `[ingest]` section
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            page_delay: Duration::from_millis(config.page_delay_ms),
            skip_errors: config.skip_errors,
            max_consecutive_errors: config.max_consecutive_errors.max(1),
            max_pages: config.max_pages,
        }
    }

    /// Overrides the page cap
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back without records; the catalog is exhausted
    EmptyPage,
    /// The page cap was reached
    PageLimit,
    /// A page failed while errors were not being skipped
    FetchFailed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::EmptyPage => "empty page",
            Self::PageLimit => "page limit",
            Self::FetchFailed => "fetch failed",
        };
        f.write_str(label)
    }
}

/// Outcome of one ingestion run
#[derive(Debug, Clone)]
pub struct IngestRun {
    /// All records, in page order then upstream order
    pub records: Vec<Record>,
    pub pages_requested: u32,
    /// Failed pages over the whole run
    pub error_count: u32,
    pub stop_reason: StopReason,
}

/// Walks the pages of one category
///
/// Pages are fetched strictly one after another; the emptiness of each page
/// decides whether the next one is requested.
pub struct PageIngestor<'a, F: JsonFetcher + ?Sized> {
    fetcher: &'a F,
    api: &'a ApiConfig,
    probe_interval: Duration,
}

impl<'a, F: JsonFetcher + ?Sized> PageIngestor<'a, F> {
    pub fn new(fetcher: &'a F, api: &'a ApiConfig) -> Self {
        Self {
            fetcher,
            api,
            probe_interval: Duration::from_secs(1),
        }
    }

    /// Sets the fixed wait between last-page probes
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Ingests every page of a category
    ///
    /// # Pagination Policy
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Next page beyond `max_pages` | Stop |
    /// | Page with records | Reset failure streak, keep records, advance |
    /// | Page without records | Stop, catalog exhausted |
    /// | Failed page, `skip_errors` off | Stop with the records so far |
    /// | Failed page, `skip_errors` on | Count it, wait `2×delay`, advance |
    /// | Failure streak hits the threshold | Reset the streak, extra `3×delay` wait |
    ///
    /// A failed page is never fetched again; the run trades completeness for
    /// bounded runtime. After every page the loop waits a jittered delay in
    /// `[delay, 2×delay]`.
    ///
    /// # Arguments
    ///
    /// * `shard` - Category shard
    /// * `query` - Resolved category query parameters
    /// * `options` - Pagination policy
    pub async fn ingest(&self, shard: &str, query: &str, options: &IngestOptions) -> IngestRun {
        let request = ApiRequest::new(self.api, shard, query);
        let mut records = Vec::new();
        let mut page: u32 = 1;
        let mut pages_requested = 0;
        let mut consecutive_errors = 0;
        let mut error_count = 0;

        match options.max_pages {
            Some(max) => tracing::info!("Ingesting {} ({}), at most {} pages", shard, query, max),
            None => tracing::info!("Ingesting {} ({})", shard, query),
        }

        let stop_reason = loop {
            if options.max_pages == Some(0) {
                break StopReason::PageLimit;
            }

            let url = request.page_url(page);
            pages_requested += 1;

            match self.fetcher.fetch_json(&url).await {
                Ok(payload) => {
                    let batch = parse_products(&payload, shard, query);
                    if batch.is_empty() {
                        tracing::info!("Page {} is empty, catalog exhausted", page);
                        break StopReason::EmptyPage;
                    }

                    consecutive_errors = 0;
                    tracing::info!("Page {}: {} records", page, batch.len());
                    records.extend(batch);
                }
                Err(failure) => {
                    consecutive_errors += 1;
                    error_count += 1;
                    tracing::warn!(
                        "Page {} failed ({} in a row): {}",
                        page,
                        consecutive_errors,
                        failure
                    );

                    if !options.skip_errors {
                        break StopReason::FetchFailed;
                    }

                    if consecutive_errors >= options.max_consecutive_errors {
                        tracing::warn!(
                            "{} failed pages in a row, skipping ahead",
                            consecutive_errors
                        );
                        consecutive_errors = 0;
                        tokio::time::sleep(options.page_delay * 3).await;
                    }
                    tokio::time::sleep(options.page_delay * 2).await;
                }
            }

            page = match page.checked_add(1) {
                Some(next) => next,
                None => break StopReason::PageLimit,
            };
            if options.max_pages.is_some_and(|max| page > max) {
                tracing::info!("Reached the limit of {} pages", page - 1);
                break StopReason::PageLimit;
            }
            tokio::time::sleep(jitter(options.page_delay)).await;
        };

        tracing::info!(
            "Ingestion of {} finished ({}): {} records from {} pages, {} errors",
            shard,
            stop_reason,
            records.len(),
            pages_requested,
            error_count
        );

        IngestRun {
            records,
            pages_requested,
            error_count,
            stop_reason,
        }
    }

    /// Finds the last page of a category that still holds records
    ///
    /// Doubles the probe page from `start_page` while pages hold data, never
    /// going past `max_probe_page`, then binary-searches between the last
    /// page with data and the first empty or failed one.
    ///
    /// # Returns
    ///
    /// * `Some(page)` - Last page known to hold records
    /// * `None` - `start_page` itself holds no records or lies past `max_probe_page`
    pub async fn find_last_page(
        &self,
        shard: &str,
        query: &str,
        start_page: u32,
        max_probe_page: u32,
    ) -> Option<u32> {
        let request = ApiRequest::new(self.api, shard, query);
        let start = start_page.max(1);
        if start > max_probe_page {
            tracing::warn!("Start page {} is past the probe limit {}", start, max_probe_page);
            return None;
        }

        if !self.probe(&request, shard, query, start).await {
            tracing::info!("Start page {} is already empty", start);
            return None;
        }

        let mut last_full = start;
        let first_empty = loop {
            if last_full >= max_probe_page {
                tracing::info!("Probe limit {} reached", max_probe_page);
                return Some(last_full);
            }

            let next = last_full
                .saturating_mul(2)
                .min(max_probe_page)
                .max(last_full + 1);
            tokio::time::sleep(self.probe_interval).await;

            if self.probe(&request, shard, query, next).await {
                last_full = next;
            } else {
                break next;
            }
        };

        tracing::debug!("Searching between pages {} and {}", last_full, first_empty);
        let (mut lo, mut hi) = (last_full, first_empty);
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            tokio::time::sleep(self.probe_interval).await;

            if self.probe(&request, shard, query, mid).await {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        tracing::info!("Last page of {} is {}", shard, lo);
        Some(lo)
    }

    /// True if the page holds at least one record; failures count as empty
    async fn probe(&self, request: &ApiRequest, shard: &str, query: &str, page: u32) -> bool {
        match self.fetcher.fetch_json(&request.page_url(page)).await {
            Ok(payload) => {
                let count = parse_products(&payload, shard, query).len();
                tracing::debug!("Probe page {}: {} records", page, count);
                count > 0
            }
            Err(failure) => {
                tracing::debug!("Probe page {} failed: {}", page, failure);
                false
            }
        }
    }
}

/// Uniform delay in `[base, 2×base]`
fn jitter(base: Duration) -> Duration {
    if base.is_zero() {
        return base;
    }
    base + rand::thread_rng().gen_range(Duration::ZERO..=base)
}
