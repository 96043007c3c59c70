//! Storage traits and error types
//!
//! This module defines the trait interface for record store backends and
//! associated error types.

use crate::ingest::Record;
use crate::storage::{StoredRecord, StoredSchema, WriteMode};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Table {table} has neither price_with_discount nor price_witch_discount")]
    SchemaMismatch { table: String },

    #[error("Table {0} does not exist")]
    MissingTable(String),

    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for record store implementations
///
/// A store owns one destination table. That table may use either the
/// current or the legacy name for the discounted price column; writers
/// detect which before every batch.
pub trait RecordStore {
    /// Creates the destination table with the current layout if it is missing
    fn ensure_schema(&self) -> StoreResult<()>;

    /// Reports which discount column the destination table uses
    fn detect_schema(&self) -> StoreResult<StoredSchema>;

    /// Writes a batch of records in a single transaction
    ///
    /// Records are projected onto the columns the table actually has. An
    /// empty batch is a no-op and touches nothing.
    ///
    /// # Returns
    ///
    /// The number of records written
    fn save(&self, records: &[Record], mode: WriteMode) -> StoreResult<usize>;

    /// Most recently stored records, newest first
    fn latest(&self, limit: usize) -> StoreResult<Vec<StoredRecord>>;

    /// Number of stored records
    fn count(&self) -> StoreResult<u64>;
}
