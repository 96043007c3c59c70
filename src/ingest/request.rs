use crate::config::ApiConfig;
use crate::url::split_query;
use std::collections::BTreeMap;

/// Page URL builder for one category
///
/// Request URLs have the form `{base}/{shard}/v2/catalog?{params}&page={n}`.
/// The parameter set is the fixed configuration parameters overlaid with the
/// resolved query parameters of the category. Keys are emitted in sorted
/// order and values verbatim, so the same inputs always give the same URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    endpoint: String,
    query_string: String,
}

impl ApiRequest {
    /// Builds the request for a category
    ///
    /// # Arguments
    ///
    /// * `api` - Base URL and fixed parameters
    /// * `shard` - Category shard
    /// * `query` - Resolved `key=value&...` parameters; they override fixed ones
    pub fn new(api: &ApiConfig, shard: &str, query: &str) -> Self {
        let mut params: BTreeMap<String, String> = api.params.clone();
        params.extend(split_query(query));

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        Self {
            endpoint: format!("{}/{}/v2/catalog", api.base_url.trim_end_matches('/'), shard),
            query_string,
        }
    }

    /// URL of the given page
    pub fn page_url(&self, page: u32) -> String {
        if self.query_string.is_empty() {
            format!("{}?page={}", self.endpoint, page)
        } else {
            format!("{}?{}&page={}", self.endpoint, self.query_string, page)
        }
    }
}
