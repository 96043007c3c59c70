//! Storage module for persisting ingested records
//!
//! This module handles all database operations for ingestion, including:
//! - Destination table creation
//! - Detection of the legacy and current column layouts
//! - Transactional batch writes in append or replace mode
//! - Reading back the most recent records

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteRecordStore;
pub use traits::{RecordStore, StoreError, StoreResult};

use crate::ingest::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Opens a record store on a SQLite database file and ensures its table
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `table` - Destination table
pub fn open_store(path: &Path, table: &str) -> StoreResult<SqliteRecordStore> {
    let store = SqliteRecordStore::new(path, table)?;
    store.ensure_schema()?;
    Ok(store)
}

/// How a batch is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Add to the existing rows
    Append,
    /// Remove existing rows first, in the same transaction
    #[default]
    Replace,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Append => f.write_str("append"),
            Self::Replace => f.write_str("replace"),
        }
    }
}

/// Column holding the discounted price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountColumn {
    /// `price_with_discount`
    Current,
    /// `price_witch_discount`
    Legacy,
}

impl DiscountColumn {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Current => "price_with_discount",
            Self::Legacy => "price_witch_discount",
        }
    }
}

/// Detected layout of the destination table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSchema {
    pub discount: DiscountColumn,

    /// Every column the table has
    pub columns: BTreeSet<String>,
}

impl StoredSchema {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }
}

/// A record read back from the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    #[serde(flatten)]
    pub record: Record,

    /// Insertion time, when the table tracks it
    pub created_at: Option<DateTime<Utc>>,
}
