use serde::Serialize;

/// One normalized catalog product
///
/// Prices are in major currency units. Every numeric field is nullable; an
/// absent upstream value is never turned into zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub name: Option<String>,

    /// Price before discount (upstream `basic`)
    pub price_before_discount: Option<f64>,

    /// Price after discount (upstream `product`)
    pub price_after_discount: Option<f64>,

    pub rating: Option<f64>,

    /// Upstream `nmFeedbacks`
    pub review_count: Option<i64>,

    /// Shard the record was fetched from
    pub shard: String,

    /// Resolved query parameters the record was fetched with
    pub query_params: String,
}
