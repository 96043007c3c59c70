use crate::url::normalize::{decode, parse_lenient};

/// Query keys that scope a catalog request, in priority order
const SCOPE_KEYS: &[&str] = &["cat", "subject", "kind"];

/// Path segment that precedes the shard in storefront catalog URLs
const CATALOG_SEGMENT: &str = "catalog";

/// Routing parameters recovered from the structure of a storefront URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParams {
    /// Segment following the literal `catalog` path segment
    pub shard: Option<String>,

    /// First scoping query parameter as `key=value`, or the raw query string
    pub query: Option<String>,
}

/// Extracts `shard` and `query` directly from a storefront URL
///
/// The shard is the path segment following the first literal `catalog`
/// segment. The query is the first of `cat`, `subject` or `kind` present in
/// the query string, formatted as `key=value`; without any of them the raw
/// query string is used verbatim. Unparseable URLs yield empty params.
///
/// # Examples
///
/// ```
/// use catalog_ingest::url::extract_url_params;
///
/// let params = extract_url_params("https://example.com/catalog/bl_shirts?subject=41&kind=2");
/// assert_eq!(params.shard.as_deref(), Some("bl_shirts"));
/// assert_eq!(params.query.as_deref(), Some("subject=41"));
/// ```
pub fn extract_url_params(url_str: &str) -> UrlParams {
    let url = match parse_lenient(url_str) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Cannot extract params from {}: {}", url_str, e);
            return UrlParams::default();
        }
    };

    let shard = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect::<Vec<_>>())
        .and_then(|segments| {
            segments
                .iter()
                .position(|s| *s == CATALOG_SEGMENT)
                .and_then(|pos| segments.get(pos + 1))
                .map(|s| decode(s))
        });

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let scoped = SCOPE_KEYS.iter().find_map(|key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(k, v)| format!("{}={}", k, v))
    });

    let query = scoped.or_else(|| {
        url.query()
            .filter(|q| !q.is_empty())
            .map(|q| q.to_string())
    });

    UrlParams { shard, query }
}

/// Splits an opaque `a=1&b=2` parameter string into key/value pairs
///
/// Fragments without `=` are dropped; values keep any further `=` verbatim.
pub fn split_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter_map(|param| param.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_after_catalog_segment() {
        let params = extract_url_params("https://example.com/catalog/obuv/zhenskaya");
        assert_eq!(params.shard.as_deref(), Some("obuv"));
        assert_eq!(params.query, None);
    }

    #[test]
    fn test_catalog_segment_not_first() {
        let params = extract_url_params("/ru/catalog/men_clothes?cat=8126");
        assert_eq!(params.shard.as_deref(), Some("men_clothes"));
        assert_eq!(params.query.as_deref(), Some("cat=8126"));
    }

    #[test]
    fn test_non_ascii_shard_is_decoded() {
        let params = extract_url_params("https://www.shop.example/catalog/обувь?cat=7");
        assert_eq!(params.shard.as_deref(), Some("обувь"));
        assert_eq!(params.query.as_deref(), Some("cat=7"));
    }

    #[test]
    fn test_no_catalog_segment() {
        let params = extract_url_params("https://example.com/brands/nike");
        assert_eq!(params.shard, None);
    }

    #[test]
    fn test_catalog_as_last_segment() {
        let params = extract_url_params("https://example.com/catalog/");
        assert_eq!(params.shard, None);
    }

    #[test]
    fn test_scope_key_priority() {
        let params = extract_url_params("/catalog/x?kind=3&subject=2&cat=1");
        assert_eq!(params.query.as_deref(), Some("cat=1"));

        let params = extract_url_params("/catalog/x?kind=3&subject=2");
        assert_eq!(params.query.as_deref(), Some("subject=2"));
    }

    #[test]
    fn test_raw_query_fallback() {
        let params = extract_url_params("/catalog/x?brand=27445&sort=new");
        assert_eq!(params.query.as_deref(), Some("brand=27445&sort=new"));
    }

    #[test]
    fn test_unparseable_url() {
        assert_eq!(extract_url_params("mailto:x@y.z"), UrlParams::default());
    }

    #[test]
    fn test_split_query() {
        assert_eq!(
            split_query("cat=5&flag&x=a=b"),
            vec![
                ("cat".to_string(), "5".to_string()),
                ("x".to_string(), "a=b".to_string())
            ]
        );
        assert!(split_query("").is_empty());
    }
}
