//! Integration tests for category ingestion
//!
//! These tests use wiremock as the catalog API, a category tree file and a
//! SQLite database in a temporary directory, and drive the full
//! resolve, paginate and store cycle end-to-end.

use catalog_ingest::config::{parse_config, Config};
use catalog_ingest::storage::{RecordStore, SqliteRecordStore};
use catalog_ingest::IngestService;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TREE: &str = r#"[
  {
    "id": 100,
    "name": "Accessories",
    "url": "/catalog/aksessuary",
    "childs": [
      {
        "id": 101,
        "name": "Umbrellas",
        "url": "/catalog/aksessuary/zonty",
        "shard": "umbrellas",
        "query": "cat=9"
      }
    ]
  }
]"#;

fn products(names: &[&str]) -> Value {
    let items: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "rating": 4.8,
                "nmFeedbacks": 31,
                "sizes": [{"price": {"basic": 259900, "product": 129950}}]
            })
        })
        .collect();
    json!({"data": {"products": items}})
}

/// Creates a test configuration pointing at the mock server and the temp dir
fn create_test_config(server: &MockServer, dir: &TempDir, extra: &str) -> Config {
    let tree_path = dir.path().join("tree.json");
    if !tree_path.exists() {
        std::fs::write(&tree_path, TREE).unwrap();
    }

    parse_config(&format!(
        r#"
[api]
base-url = "{base}/catalog"

[fetcher]
timeout-secs = 5
retries = 2
retry-delay-min-ms = 0
retry-delay-max-ms = 0
rate-limit-cooldown-ms = 0

[ingest]
page-delay-ms = 0
probe-interval-ms = 0
{extra}

[catalog]
tree-path = "{tree}"

[output]
database-path = "{db}"
"#,
        base = server.uri(),
        extra = extra,
        tree = tree_path.display(),
        db = dir.path().join("catalog.db").display(),
    ))
    .unwrap()
}

async fn mount_pages(server: &MockServer, pages: &[&[&str]]) {
    for (i, names) in pages.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/catalog/umbrellas/v2/catalog"))
            .and(query_param("cat", "9"))
            .and(query_param("page", (i + 1).to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(products(names)))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/catalog/umbrellas/v2/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(products(&[])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ingest_category_end_to_end() {
    let server = MockServer::start().await;
    mount_pages(&server, &[&["Red", "Blue"], &["Green"]]).await;

    let dir = TempDir::new().unwrap();
    let service = IngestService::from_config(create_test_config(&server, &dir, "")).unwrap();

    let report = service
        .ingest_category("https://www.shop.example/catalog/aksessuary/zonty", Some("Umbrellas"), None)
        .await;
    assert!(report.success, "{}", report.message);
    assert_eq!(report.record_count, 3);

    let rows = service.latest(10).await.unwrap();
    assert_eq!(rows.len(), 3);
    let record = &rows[0].record;
    assert_eq!(record.price_before_discount, Some(2599.0));
    assert_eq!(record.price_after_discount, Some(1299.5));
    assert_eq!(record.review_count, Some(31));
    assert_eq!(record.shard, "umbrellas");
    assert_eq!(record.query_params, "cat=9");

    // Replace mode: a second run leaves only its own records
    let report = service
        .ingest_category("/catalog/aksessuary/zonty", None, Some(1))
        .await;
    assert!(report.success);
    assert_eq!(report.record_count, 2);

    let store = SqliteRecordStore::new(&dir.path().join("catalog.db"), "wb_products").unwrap();
    assert_eq!(store.count().unwrap(), 2);
}

#[tokio::test]
async fn test_ingest_into_legacy_table() {
    let server = MockServer::start().await;
    mount_pages(&server, &[&["Old"]]).await;

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("catalog.db");
    {
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE wb_products (
                name TEXT,
                price_no_discounts REAL,
                price_witch_discount REAL,
                rating REAL,
                number_of_reviews INTEGER
            )",
        )
        .unwrap();
    }

    let service = IngestService::from_config(create_test_config(&server, &dir, "")).unwrap();
    let report = service
        .ingest_category("/catalog/aksessuary/zonty", None, None)
        .await;
    assert!(report.success, "{}", report.message);

    let conn = rusqlite::Connection::open(&db).unwrap();
    let discount: f64 = conn
        .query_row("SELECT price_witch_discount FROM wb_products", [], |row| row.get(0))
        .unwrap();
    assert_eq!(discount, 1299.5);
}

#[tokio::test]
async fn test_upstream_failure_without_skip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, &dir, "skip-errors = false");
    let service = IngestService::from_config(config).unwrap();

    let report = service
        .ingest_category("/catalog/aksessuary/zonty", None, None)
        .await;
    assert!(!report.success);
    assert_eq!(report.record_count, 0);
}

#[tokio::test]
async fn test_find_last_page_against_api() {
    let server = MockServer::start().await;
    mount_pages(&server, &[&["a"], &["b"], &["c"], &["d"], &["e"]]).await;

    let dir = TempDir::new().unwrap();
    let service = IngestService::from_config(create_test_config(&server, &dir, "")).unwrap();

    let last = service
        .find_last_page("/catalog/aksessuary/zonty", None, 1)
        .await
        .unwrap();
    assert_eq!(last, Some(5));
}

#[tokio::test]
async fn test_reload_picks_up_new_categories() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let service = IngestService::from_config(create_test_config(&server, &dir, "")).unwrap();

    assert!(service.resolve_category("/catalog/obuv", Some("Shoes")).unwrap().query.is_none());

    std::fs::write(
        Path::new(&service.config().catalog.tree_path),
        r#"[{"id": 7, "name": "Shoes", "url": "/catalog/obuv", "shard": "shoes", "query": "cat=7"}]"#,
    )
    .unwrap();
    assert_eq!(service.reload_index().unwrap(), 1);

    let params = service.resolve_category("/catalog/obuv", Some("Shoes")).unwrap();
    assert_eq!(params.pair(), Some(("shoes", "cat=7")));
}
