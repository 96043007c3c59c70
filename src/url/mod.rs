//! URL handling module for Catalog-Ingest
//!
//! This module provides lenient URL parsing (category URLs in the tree are
//! frequently relative), path extraction, the tail normalization used by the
//! fuzzy category match, and extraction of catalog routing parameters from a
//! storefront URL.

mod normalize;
mod params;

// Re-export main functions
pub use normalize::{parse_lenient, url_path, url_tail};
pub use params::{extract_url_params, split_query, UrlParams};
