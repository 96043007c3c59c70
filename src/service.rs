//! Category ingestion service
//!
//! Ties the category index, resolver, page ingestor and record store
//! together behind the two caller-facing operations: ingesting a category
//! and resolving its parameters for diagnostics.

use crate::category::IndexHandle;
use crate::config::Config;
use crate::ingest::{HttpFetcher, IngestOptions, JsonFetcher, PageIngestor, StopReason};
use crate::resolver::{CategoryParams, CategoryResolver, ResolveError};
use crate::storage::{open_store, RecordStore, StoredRecord};
use crate::IngestError;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Caller-facing outcome of a category ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub success: bool,
    pub record_count: usize,
    /// Human-readable diagnostic
    pub message: String,
}

impl IngestReport {
    fn succeeded(record_count: usize, message: String) -> Self {
        Self {
            success: true,
            record_count,
            message,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            record_count: 0,
            message,
        }
    }
}

/// Ingestion service
///
/// Cheap to share behind an `Arc`; every operation takes `&self`.
pub struct IngestService {
    config: Arc<Config>,
    index: Arc<IndexHandle>,
    resolver: CategoryResolver,
    fetcher: Arc<dyn JsonFetcher>,
    store: Arc<dyn RecordStore + Send + Sync>,
}

impl IngestService {
    /// Builds the service from configuration
    ///
    /// Loads the category tree, builds the HTTP client and opens the
    /// destination store, creating its table when missing.
    ///
    /// # Returns
    ///
    /// * `Ok(IngestService)` - Ready to ingest
    /// * `Err(IngestError)` - The tree, the client or the store could not be set up
    pub fn from_config(config: Config) -> crate::Result<Self> {
        let index = IndexHandle::load(Path::new(&config.catalog.tree_path))?;
        let fetcher = HttpFetcher::new(&config.api, &config.fetcher)?;
        let store = open_store(Path::new(&config.output.database_path), &config.output.table)?;

        Ok(Self::new(
            Arc::new(config),
            Arc::new(index),
            Arc::new(fetcher),
            Arc::new(store),
        ))
    }

    /// Assembles the service from already built parts
    pub fn new(
        config: Arc<Config>,
        index: Arc<IndexHandle>,
        fetcher: Arc<dyn JsonFetcher>,
        store: Arc<dyn RecordStore + Send + Sync>,
    ) -> Self {
        Self {
            config,
            index,
            resolver: CategoryResolver::new(),
            fetcher,
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared category index handle
    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    /// Resolves the routing parameters of a category URL
    pub fn resolve_category(
        &self,
        url: &str,
        name: Option<&str>,
    ) -> Result<CategoryParams, ResolveError> {
        let index = self.index.current();
        self.resolver.resolve(index.as_ref(), url, name)
    }

    /// Rebuilds the category index from the tree file
    pub fn reload_index(&self) -> crate::Result<usize> {
        self.index.reload()
    }

    /// Ingests every page of a category and stores the records
    ///
    /// Never fails outright; problems are reported through the returned
    /// [`IngestReport`].
    ///
    /// # Arguments
    ///
    /// * `url` - Storefront category URL
    /// * `name` - Optional category display name
    /// * `max_pages` - Page cap; falls back to the configured one
    pub async fn ingest_category(
        &self,
        url: &str,
        name: Option<&str>,
        max_pages: Option<u32>,
    ) -> IngestReport {
        tracing::info!("Ingesting category {} ({})", url, name.unwrap_or("unnamed"));

        let params = match self.resolve_category(url, name) {
            Ok(params) => params,
            Err(e) => return IngestReport::failed(e.to_string()),
        };

        let Some((shard, query)) = params.pair() else {
            let message = format!(
                "Incomplete category parameters for {}: shard={:?}, query={:?}",
                url, params.shard, params.query
            );
            tracing::warn!("{}", message);
            return IngestReport::failed(message);
        };

        let options = IngestOptions::from_config(&self.config.ingest)
            .with_max_pages(max_pages.or(self.config.ingest.max_pages));
        let run = PageIngestor::new(self.fetcher.as_ref(), &self.config.api)
            .ingest(shard, query, &options)
            .await;

        if run.records.is_empty() {
            let reason = match run.stop_reason {
                StopReason::FetchFailed => "the first page could not be fetched",
                StopReason::EmptyPage | StopReason::PageLimit => "the category returned no products",
            };
            let message = format!("No products ingested for {}: {}", url, reason);
            tracing::warn!("{}", message);
            return IngestReport::failed(message);
        }

        let pages = run.pages_requested;
        let errors = run.error_count;
        match self.save(run.records).await {
            Ok(count) => IngestReport::succeeded(
                count,
                format!(
                    "Saved {} records from {} pages ({} failed pages)",
                    count, pages, errors
                ),
            ),
            Err(e) => {
                tracing::error!("Failed to store records for {}: {}", url, e);
                IngestReport::failed(format!("Failed to store records: {}", e))
            }
        }
    }

    /// Finds the last page of a category that holds records
    ///
    /// # Returns
    ///
    /// * `Ok(Some(page))` - Last page with records
    /// * `Ok(None)` - The start page is already empty
    /// * `Err(IngestError)` - The category could not be resolved completely
    pub async fn find_last_page(
        &self,
        url: &str,
        name: Option<&str>,
        start_page: u32,
    ) -> crate::Result<Option<u32>> {
        let params = self.resolve_category(url, name)?;
        let (shard, query) = params.pair().ok_or_else(|| ResolveError::Incomplete {
            url: url.to_string(),
        })?;

        let ingest = &self.config.ingest;
        let last = PageIngestor::new(self.fetcher.as_ref(), &self.config.api)
            .with_probe_interval(Duration::from_millis(ingest.probe_interval_ms))
            .find_last_page(shard, query, start_page, ingest.max_probe_page)
            .await;
        Ok(last)
    }

    /// Most recently stored records
    pub async fn latest(&self, limit: usize) -> crate::Result<Vec<StoredRecord>> {
        let store = Arc::clone(&self.store);
        let rows = tokio::task::spawn_blocking(move || store.latest(limit)).await??;
        Ok(rows)
    }

    async fn save(&self, records: Vec<crate::ingest::Record>) -> Result<usize, IngestError> {
        let store = Arc::clone(&self.store);
        let mode = self.config.output.write_mode;
        let count = tokio::task::spawn_blocking(move || store.save(&records, mode)).await??;
        Ok(count)
    }
}
