//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.

use crate::config::is_identifier;
use crate::ingest::Record;
use crate::storage::schema::{detect_schema, initialize_schema, quote_ident};
use crate::storage::traits::{RecordStore, StoreError, StoreResult};
use crate::storage::{DiscountColumn, StoredRecord, StoredSchema, WriteMode};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Columns a record may be written to, in insertion order
const RECORD_COLUMNS: &[&str] = &[
    "name",
    "price_no_discounts",
    "price_with_discount",
    "price_witch_discount",
    "rating",
    "number_of_reviews",
    "shard",
    "query_params",
];

/// SQLite record store
///
/// The connection sits behind a mutex, so detecting the layout and writing
/// a batch happen as one unit per call.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteRecordStore {
    /// Opens (or creates) a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `table` - Destination table; must be a plain identifier
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRecordStore)` - Successfully opened database
    /// * `Err(StoreError)` - Invalid table name or the database could not be opened
    pub fn new(path: &Path, table: &str) -> StoreResult<Self> {
        check_table(table)?;
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory(table: &str) -> StoreResult<Self> {
        check_table(table)?;
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            table: table.to_string(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn check_table(table: &str) -> StoreResult<()> {
    if is_identifier(table) {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}

impl RecordStore for SqliteRecordStore {
    fn ensure_schema(&self) -> StoreResult<()> {
        initialize_schema(&self.lock(), &self.table)?;
        Ok(())
    }

    fn detect_schema(&self) -> StoreResult<StoredSchema> {
        detect_schema(&self.lock(), &self.table)
    }

    fn save(&self, records: &[Record], mode: WriteMode) -> StoreResult<usize> {
        if records.is_empty() {
            tracing::debug!("Nothing to save into {}", self.table);
            return Ok(0);
        }

        let mut conn = self.lock();
        let schema = detect_schema(&conn, &self.table)?;
        if schema.discount == DiscountColumn::Legacy {
            tracing::info!("Table {} uses the legacy discount column", self.table);
        }

        let columns: Vec<&str> = RECORD_COLUMNS
            .iter()
            .copied()
            .filter(|c| schema.has_column(c))
            .filter(|c| !c.starts_with("price_wit") || *c == schema.discount.name())
            .collect();

        let table = quote_ident(&self.table);
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
            (1..=columns.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let tx = conn.transaction()?;
        if mode == WriteMode::Replace {
            let removed = tx.execute(&format!("DELETE FROM {}", table), [])?;
            tracing::debug!("Replacing {} rows in {}", removed, self.table);
        }

        {
            let mut stmt = tx.prepare(&insert)?;
            for record in records {
                stmt.execute(params_from_iter(
                    columns.iter().map(|c| column_value(record, c)),
                ))?;
            }
        }
        tx.commit()?;

        tracing::info!(
            "Saved {} records into {} ({})",
            records.len(),
            self.table,
            mode
        );
        Ok(records.len())
    }

    fn latest(&self, limit: usize) -> StoreResult<Vec<StoredRecord>> {
        let conn = self.lock();
        let schema = detect_schema(&conn, &self.table)?;

        let select = |column: &str| {
            if schema.has_column(column) {
                quote_ident(column)
            } else {
                "NULL".to_string()
            }
        };
        let order = if schema.has_column("created_at") {
            "\"created_at\" DESC, rowid DESC"
        } else {
            "rowid DESC"
        };

        let sql = format!(
            "SELECT {}, {}, {}, {}, {}, {}, {}, {} FROM {} ORDER BY {} LIMIT ?1",
            select("name"),
            select("price_no_discounts"),
            quote_ident(schema.discount.name()),
            select("rating"),
            select("number_of_reviews"),
            select("shard"),
            select("query_params"),
            select("created_at"),
            quote_ident(&self.table),
            order
        );

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([limit], |row| {
                Ok(StoredRecord {
                    record: Record {
                        name: opt_text(row, 0)?,
                        price_before_discount: opt_f64(row, 1)?,
                        price_after_discount: opt_f64(row, 2)?,
                        rating: opt_f64(row, 3)?,
                        review_count: opt_i64(row, 4)?,
                        shard: opt_text(row, 5)?.unwrap_or_default(),
                        query_params: opt_text(row, 6)?.unwrap_or_default(),
                    },
                    created_at: opt_text(row, 7)?.as_deref().and_then(parse_timestamp),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn count(&self) -> StoreResult<u64> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// Value of a record field for one destination column
fn column_value(record: &Record, column: &str) -> Value {
    match column {
        "name" => text(record.name.as_deref()),
        "price_no_discounts" => decimal(record.price_before_discount),
        "price_with_discount" | "price_witch_discount" => decimal(record.price_after_discount),
        "rating" => decimal(record.rating),
        "number_of_reviews" => record.review_count.map_or(Value::Null, Value::Integer),
        "shard" => text(Some(&record.shard)),
        "query_params" => text(Some(&record.query_params)),
        _ => Value::Null,
    }
}

fn text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::Text(s.to_string()))
}

/// Two-decimal value; non-finite numbers become NULL
fn decimal(value: Option<f64>) -> Value {
    match value {
        Some(v) if v.is_finite() => Value::Real((v * 100.0).round() / 100.0),
        _ => Value::Null,
    }
}

fn opt_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

fn opt_f64(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Real(f) => Some(f),
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

fn opt_i64(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) => Some(f as i64),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

/// Parses SQLite `CURRENT_TIMESTAMP` text or RFC 3339
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn record(name: &str, before: Option<f64>, after: Option<f64>) -> Record {
        Record {
            name: Some(name.to_string()),
            price_before_discount: before,
            price_after_discount: after,
            rating: Some(4.666),
            review_count: Some(12),
            shard: "bags".to_string(),
            query_params: "cat=1".to_string(),
        }
    }

    fn store() -> SqliteRecordStore {
        let store = SqliteRecordStore::open_in_memory("wb_products").unwrap();
        store.ensure_schema().unwrap();
        store
    }

    fn legacy_store(ddl: &str) -> SqliteRecordStore {
        let store = SqliteRecordStore::open_in_memory("wb_products").unwrap();
        store.lock().execute_batch(ddl).unwrap();
        store
    }

    #[test]
    fn test_round_trip_current_layout() {
        let store = store();
        let saved = store
            .save(&[record("Bag", Some(129.99), Some(99.999))], WriteMode::Append)
            .unwrap();
        assert_eq!(saved, 1);

        let rows = store.latest(10).unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0].record;
        assert_eq!(row.name.as_deref(), Some("Bag"));
        assert_eq!(row.price_before_discount, Some(129.99));
        assert_eq!(row.price_after_discount, Some(100.0));
        assert_eq!(row.rating, Some(4.67));
        assert_eq!(row.review_count, Some(12));
        assert_eq!(row.shard, "bags");
        assert_eq!(row.query_params, "cat=1");
        assert!(rows[0].created_at.is_some());
    }

    #[test]
    fn test_round_trip_legacy_layout() {
        let store = legacy_store(
            "CREATE TABLE wb_products (
                name TEXT,
                price_no_discounts REAL,
                price_witch_discount REAL,
                rating REAL,
                number_of_reviews INTEGER
            )",
        );
        assert_eq!(store.detect_schema().unwrap().discount, DiscountColumn::Legacy);

        store
            .save(&[record("Old", Some(10.5), Some(8.25))], WriteMode::Append)
            .unwrap();

        let discount: f64 = store
            .lock()
            .query_row("SELECT price_witch_discount FROM wb_products", [], |r| r.get(0))
            .unwrap();
        assert_eq!(discount, 8.25);

        let rows = store.latest(5).unwrap();
        assert_eq!(rows[0].record.price_before_discount, Some(10.5));
        assert_eq!(rows[0].record.price_after_discount, Some(8.25));
        assert_eq!(rows[0].record.shard, "");
        assert_eq!(rows[0].created_at, None);
    }

    #[test]
    fn test_nulls_stay_null() {
        let store = store();
        let mut rec = record("Free", None, Some(f64::NAN));
        rec.rating = None;
        rec.review_count = None;
        store.save(&[rec], WriteMode::Append).unwrap();

        let row = &store.latest(1).unwrap()[0].record;
        assert_eq!(row.price_before_discount, None);
        assert_eq!(row.price_after_discount, None);
        assert_eq!(row.rating, None);
        assert_eq!(row.review_count, None);
    }

    #[test]
    fn test_append_and_replace() {
        let store = store();
        store
            .save(&[record("a", None, None), record("b", None, None)], WriteMode::Append)
            .unwrap();
        store.save(&[record("c", None, None)], WriteMode::Append).unwrap();
        assert_eq!(store.count().unwrap(), 3);

        store.save(&[record("d", None, None)], WriteMode::Replace).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.latest(10).unwrap()[0].record.name.as_deref(), Some("d"));
    }

    #[test]
    fn test_latest_is_newest_first() {
        let store = store();
        store
            .save(
                &[record("first", None, None), record("second", None, None), record("third", None, None)],
                WriteMode::Append,
            )
            .unwrap();

        let names: Vec<_> = store
            .latest(2)
            .unwrap()
            .into_iter()
            .map(|r| r.record.name.unwrap())
            .collect();
        assert_eq!(names, vec!["third", "second"]);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let store = SqliteRecordStore::open_in_memory("wb_products").unwrap();
        assert_eq!(store.save(&[], WriteMode::Replace).unwrap(), 0);
        assert!(matches!(
            store.detect_schema(),
            Err(StoreError::MissingTable(_))
        ));
    }

    #[test]
    fn test_schema_mismatch_writes_nothing() {
        let store = legacy_store("CREATE TABLE wb_products (name TEXT, price REAL)");

        let result = store.save(&[record("x", Some(1.0), Some(1.0))], WriteMode::Replace);
        assert!(matches!(result, Err(StoreError::SchemaMismatch { .. })));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_invalid_table_name() {
        assert!(matches!(
            SqliteRecordStore::open_in_memory("products; DROP TABLE x"),
            Err(StoreError::InvalidTable(_))
        ));
    }

    #[test]
    fn test_file_backed_store() {
        let file = NamedTempFile::new().unwrap();
        {
            let store = SqliteRecordStore::new(file.path(), "wb_products").unwrap();
            store.ensure_schema().unwrap();
            store.save(&[record("kept", None, None)], WriteMode::Append).unwrap();
        }

        let reopened = SqliteRecordStore::new(file.path(), "wb_products").unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2024-05-01 12:30:00").is_some());
        assert!(parse_timestamp("2024-05-01T12:30:00+03:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
