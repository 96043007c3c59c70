//! Table layout definitions and detection
//!
//! The destination table exists in two historical layouts that differ only
//! in the name of the discounted price column.

use crate::storage::traits::{StoreError, StoreResult};
use crate::storage::{DiscountColumn, StoredSchema};
use rusqlite::Connection;
use std::collections::BTreeSet;

/// Quotes a validated identifier for use in SQL text
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL creating the destination table with the current layout
pub fn create_table_sql(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    price_no_discounts REAL,
    price_with_discount REAL,
    rating REAL,
    number_of_reviews INTEGER,
    shard TEXT,
    query_params TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
        quote_ident(table)
    )
}

/// Creates the destination table if it does not exist
pub fn initialize_schema(conn: &Connection, table: &str) -> Result<(), rusqlite::Error> {
    conn.execute_batch(&create_table_sql(table))
}

/// Column names of a table, empty if the table does not exist
pub fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok(columns)
}

/// Detects the layout of the destination table
///
/// The legacy column is used only when it exists and the current one does
/// not.
pub fn detect_schema(conn: &Connection, table: &str) -> StoreResult<StoredSchema> {
    let columns = table_columns(conn, table)?;
    if columns.is_empty() {
        return Err(StoreError::MissingTable(table.to_string()));
    }

    let discount = if columns.contains(DiscountColumn::Current.name()) {
        DiscountColumn::Current
    } else if columns.contains(DiscountColumn::Legacy.name()) {
        DiscountColumn::Legacy
    } else {
        return Err(StoreError::SchemaMismatch {
            table: table.to_string(),
        });
    };

    Ok(StoredSchema { discount, columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn, "wb_products").unwrap();
        let result = initialize_schema(&conn, "wb_products");

        assert!(result.is_ok());
    }

    #[test]
    fn test_current_layout_detected() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn, "wb_products").unwrap();

        let schema = detect_schema(&conn, "wb_products").unwrap();
        assert_eq!(schema.discount, DiscountColumn::Current);
        assert!(schema.has_column("created_at"));
    }

    #[test]
    fn test_legacy_layout_detected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE old (name TEXT, price_witch_discount REAL)")
            .unwrap();

        let schema = detect_schema(&conn, "old").unwrap();
        assert_eq!(schema.discount, DiscountColumn::Legacy);
    }

    #[test]
    fn test_current_wins_when_both_exist() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE both_cols (price_witch_discount REAL, price_with_discount REAL)",
        )
        .unwrap();

        let schema = detect_schema(&conn, "both_cols").unwrap();
        assert_eq!(schema.discount, DiscountColumn::Current);
    }

    #[test]
    fn test_detect_missing_and_mismatched() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            detect_schema(&conn, "absent"),
            Err(StoreError::MissingTable(_))
        ));

        conn.execute_batch("CREATE TABLE other (name TEXT)").unwrap();
        assert!(matches!(
            detect_schema(&conn, "other"),
            Err(StoreError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("wb_products"), "\"wb_products\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
