//! Catalog-Ingest main entry point
//!
//! This is the command-line interface for the Catalog-Ingest engine.

use anyhow::{bail, Context};
use catalog_ingest::category::IndexHandle;
use catalog_ingest::config::{load_config_with_hash, Config};
use catalog_ingest::output::{print_params, print_records, print_report};
use catalog_ingest::resolver::CategoryResolver;
use catalog_ingest::storage::{RecordStore, SqliteRecordStore};
use catalog_ingest::IngestService;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Catalog-Ingest: paginated catalog ingestion
///
/// Resolves a storefront category against the category tree, pulls its
/// product pages from the catalog API and stores the normalized records in
/// SQLite.
#[derive(Parser, Debug)]
#[command(name = "catalog-ingest")]
#[command(version = "1.0.0")]
#[command(about = "Paginated catalog ingestion", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Storefront category URL
    #[arg(long, required_unless_present_any = ["dry_run", "latest"])]
    url: Option<String>,

    /// Category display name, used when the URL alone does not match
    #[arg(long)]
    name: Option<String>,

    /// Stop after this many pages (overrides the config)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Only resolve the category parameters and print them
    #[arg(long, conflicts_with_all = ["find_last_page", "latest", "dry_run"])]
    resolve: bool,

    /// Probe for the last page of the category that holds products
    #[arg(long, conflicts_with_all = ["resolve", "latest", "dry_run"])]
    find_last_page: bool,

    /// First page to probe with --find-last-page
    #[arg(long, value_name = "PAGE", requires = "find_last_page")]
    start_page: Option<u32>,

    /// Print the N most recently stored records and exit
    #[arg(long, value_name = "N", conflicts_with_all = ["resolve", "find_last_page", "dry_run"])]
    latest: Option<usize>,

    /// Validate config and show the effective settings without ingesting
    #[arg(long, conflicts_with_all = ["resolve", "find_last_page", "latest"])]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.url.as_deref());
        return Ok(());
    }

    if let Some(limit) = cli.latest {
        return handle_latest(&config, limit);
    }

    let Some(url) = cli.url.as_deref() else {
        bail!("--url is required");
    };
    let name = cli.name.as_deref();

    if cli.resolve {
        handle_resolve(&config, url, name)
    } else if cli.find_last_page {
        handle_find_last_page(config, url, name, cli.start_page.unwrap_or(1)).await
    } else {
        handle_ingest(config, url, name, cli.max_pages).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_ingest=info,warn"),
            1 => EnvFilter::new("catalog_ingest=debug,info"),
            2 => EnvFilter::new("catalog_ingest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, url: Option<&str>) {
    println!("=== Catalog-Ingest Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Fixed parameters ({}):", config.api.params.len());
    for (key, value) in &config.api.params {
        println!("    {}={}", key, value);
    }
    println!("  Headers: {}", config.api.headers.len());

    println!("\nFetcher:");
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Attempts per page: {}", config.fetcher.retries);
    println!(
        "  Retry delay: {}-{}ms",
        config.fetcher.retry_delay_min_ms, config.fetcher.retry_delay_max_ms
    );
    println!(
        "  Rate limit cooldown: {}ms",
        config.fetcher.rate_limit_cooldown_ms
    );

    println!("\nIngestion:");
    println!("  Page delay: {}ms", config.ingest.page_delay_ms);
    println!("  Skip errors: {}", config.ingest.skip_errors);
    println!(
        "  Max consecutive errors: {}",
        config.ingest.max_consecutive_errors
    );
    match config.ingest.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unlimited"),
    }

    println!("\nCatalog:");
    println!("  Tree: {}", config.catalog.tree_path);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Table: {}", config.output.table);
    println!("  Write mode: {}", config.output.write_mode);

    println!("\n✓ Configuration is valid");
    if let Some(url) = url {
        println!("✓ Would ingest {}", url);
    }
}

/// Handles the --latest mode: lists stored records
fn handle_latest(config: &Config, limit: usize) -> anyhow::Result<()> {
    println!("Database: {} ({})\n", config.output.database_path, config.output.table);

    let store = SqliteRecordStore::new(Path::new(&config.output.database_path), &config.output.table)?;
    let rows = store.latest(limit)?;
    print_records(&rows);

    Ok(())
}

/// Handles the --resolve mode: prints the category parameters
fn handle_resolve(config: &Config, url: &str, name: Option<&str>) -> anyhow::Result<()> {
    let index = IndexHandle::load(Path::new(&config.catalog.tree_path))?;
    let params = CategoryResolver::new().resolve(index.current().as_ref(), url, name)?;
    print_params(url, &params);
    Ok(())
}

/// Handles the --find-last-page mode
async fn handle_find_last_page(
    config: Config,
    url: &str,
    name: Option<&str>,
    start_page: u32,
) -> anyhow::Result<()> {
    let service = IngestService::from_config(config)?;

    match service.find_last_page(url, name, start_page).await? {
        Some(page) => println!("Last page with products: {}", page),
        None => println!("Page {} has no products", start_page),
    }
    Ok(())
}

/// Handles the main ingest operation
async fn handle_ingest(
    config: Config,
    url: &str,
    name: Option<&str>,
    max_pages: Option<u32>,
) -> anyhow::Result<()> {
    let service = IngestService::from_config(config)?;
    let report = service.ingest_category(url, name, max_pages).await;
    print_report(&report);

    if report.success {
        tracing::info!("Ingestion completed successfully");
        Ok(())
    } else {
        bail!("Ingestion failed: {}", report.message)
    }
}
