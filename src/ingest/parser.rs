//! Catalog payload normalization
//!
//! Turns one page of upstream JSON into [`Record`]s. The upstream shape is
//! `{ data: { products: [ { name, rating, nmFeedbacks, sizes: [ { price: { basic, product } } ] } ] } }`
//! and any part of it may be missing; missing pieces become nulls, never errors.

use crate::ingest::record::Record;
use serde::Deserialize;
use serde_json::Value;

/// Prices arrive in minor currency units
const MINOR_UNITS_PER_MAJOR: f64 = 100.0;

#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    data: Option<PayloadData>,
}

#[derive(Debug, Default, Deserialize)]
struct PayloadData {
    #[serde(default)]
    products: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProduct {
    #[serde(default)]
    name: Value,
    #[serde(default)]
    rating: Value,
    #[serde(default, rename = "nmFeedbacks")]
    feedbacks: Value,
    #[serde(default)]
    sizes: Value,
}

/// Normalizes a page payload into records, in upstream order
///
/// A payload that does not carry a `data.products` array yields no records,
/// which the ingestor treats as the end of the catalog. Product entries that
/// are not JSON objects are skipped.
///
/// # Arguments
///
/// * `payload` - Decoded page response
/// * `shard` - Shard the page was requested from
/// * `query` - Resolved query parameters the page was requested with
pub fn parse_products(payload: &Value, shard: &str, query: &str) -> Vec<Record> {
    let products = match Payload::deserialize(payload) {
        Ok(Payload {
            data:
                Some(PayloadData {
                    products: Some(products),
                }),
        }) => products,
        Ok(_) => return Vec::new(),
        Err(e) => {
            tracing::debug!("Payload has no product list: {}", e);
            return Vec::new();
        }
    };

    products
        .iter()
        .filter_map(|product| match RawProduct::deserialize(product) {
            Ok(raw) => Some(to_record(raw, shard, query)),
            Err(e) => {
                tracing::debug!("Skipping malformed product entry: {}", e);
                None
            }
        })
        .collect()
}

fn to_record(raw: RawProduct, shard: &str, query: &str) -> Record {
    let price = first_price(&raw.sizes);

    Record {
        name: raw.name.as_str().map(str::to_string),
        price_before_discount: price.and_then(|p| minor_to_major(p.get("basic"))),
        price_after_discount: price.and_then(|p| minor_to_major(p.get("product"))),
        rating: as_f64(&raw.rating),
        review_count: as_i64(&raw.feedbacks),
        shard: shard.to_string(),
        query_params: query.to_string(),
    }
}

/// Price object of the first size that has a non-empty one
fn first_price(sizes: &Value) -> Option<&serde_json::Map<String, Value>> {
    sizes
        .as_array()?
        .iter()
        .filter_map(|size| size.get("price")?.as_object())
        .find(|price| !price.is_empty())
}

/// Converts a minor-unit price; zero, absent or non-numeric gives `None`
fn minor_to_major(value: Option<&Value>) -> Option<f64> {
    let minor = as_f64(value?)?;
    (minor != 0.0).then(|| minor / MINOR_UNITS_PER_MAJOR)
}

/// Accepts JSON numbers and numeric strings
fn as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_product() {
        let payload = json!({
            "data": {"products": [{
                "name": "Coat",
                "rating": 4.7,
                "nmFeedbacks": 120,
                "sizes": [{"price": {"basic": 12999, "product": 9999}}]
            }]}
        });

        let records = parse_products(&payload, "outerwear", "cat=9");
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.name.as_deref(), Some("Coat"));
        assert_eq!(record.price_before_discount, Some(129.99));
        assert_eq!(record.price_after_discount, Some(99.99));
        assert_eq!(record.rating, Some(4.7));
        assert_eq!(record.review_count, Some(120));
        assert_eq!(record.shard, "outerwear");
        assert_eq!(record.query_params, "cat=9");
    }

    #[test]
    fn test_first_size_with_price_wins() {
        let payload = json!({
            "data": {"products": [{
                "sizes": [
                    {"name": "S"},
                    {"price": {}},
                    {"price": {"basic": 500}},
                    {"price": {"basic": 700, "product": 600}}
                ]
            }]}
        });

        let records = parse_products(&payload, "s", "q");
        assert_eq!(records[0].price_before_discount, Some(5.0));
        assert_eq!(records[0].price_after_discount, None);
    }

    #[test]
    fn test_absent_or_zero_price_is_null() {
        let payload = json!({
            "data": {"products": [
                {"name": "A"},
                {"name": "B", "sizes": [{"price": {"basic": 0, "product": null}}]}
            ]}
        });

        let records = parse_products(&payload, "s", "q");
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.price_before_discount, None);
            assert_eq!(record.price_after_discount, None);
            assert_eq!(record.rating, None);
            assert_eq!(record.review_count, None);
        }
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let payload = json!({
            "data": {"products": [{
                "rating": "4.5",
                "nmFeedbacks": "17",
                "sizes": [{"price": {"basic": "2500"}}]
            }]}
        });

        let record = &parse_products(&payload, "s", "q")[0];
        assert_eq!(record.rating, Some(4.5));
        assert_eq!(record.review_count, Some(17));
        assert_eq!(record.price_before_discount, Some(25.0));
    }

    #[test]
    fn test_payload_without_products() {
        assert!(parse_products(&json!({}), "s", "q").is_empty());
        assert!(parse_products(&json!({"data": {}}), "s", "q").is_empty());
        assert!(parse_products(&json!({"data": {"products": []}}), "s", "q").is_empty());
        assert!(parse_products(&json!({"data": {"products": "x"}}), "s", "q").is_empty());
        assert!(parse_products(&json!([1, 2]), "s", "q").is_empty());
    }

    #[test]
    fn test_non_object_products_skipped() {
        let payload = json!({"data": {"products": [42, {"name": "Kept"}]}});
        let records = parse_products(&payload, "s", "q");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("Kept"));
    }
}
