use crate::{UrlError, UrlResult};
use percent_encoding::percent_decode_str;
use url::Url;

/// Base used to resolve relative category URLs such as `/catalog/shoes`
const RELATIVE_BASE: &str = "http://relative.invalid/";

/// Parses a URL, accepting both absolute and host-relative forms
///
/// Category trees store a mix of `https://host/path` and `/path` URLs, so a
/// relative URL is resolved against a placeholder base instead of being
/// rejected. Only the path and query of such a URL are meaningful.
///
/// # Arguments
///
/// * `url_str` - The URL string to parse
///
/// # Returns
///
/// * `Ok(Url)` - Parsed URL
/// * `Err(UrlError)` - The URL is malformed or uses a non-HTTP scheme
///
/// # Examples
///
/// ```
/// use catalog_ingest::url::parse_lenient;
///
/// let url = parse_lenient("/catalog/obuv?cat=5").unwrap();
/// assert_eq!(url.path(), "/catalog/obuv");
/// assert_eq!(url.query(), Some("cat=5"));
/// ```
pub fn parse_lenient(url_str: &str) -> UrlResult<Url> {
    let url = match Url::parse(url_str) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(RELATIVE_BASE).map_err(|e| UrlError::Parse(e.to_string()))?;
            base.join(url_str)
                .map_err(|e| UrlError::Parse(e.to_string()))?
        }
        Err(e) => return Err(UrlError::Parse(e.to_string())),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Returns the path component of a URL, without scheme, host or query
///
/// The path is percent-decoded, so non-ASCII category paths compare equal to
/// the raw text stored in the category tree.
///
/// # Examples
///
/// ```
/// use catalog_ingest::url::url_path;
///
/// assert_eq!(
///     url_path("https://www.example.com/catalog/obuv?sort=popular").as_deref(),
///     Some("/catalog/obuv")
/// );
/// assert_eq!(url_path("/root/leaf").as_deref(), Some("/root/leaf"));
/// assert_eq!(url_path("https://www.example.com/catalog/обувь").as_deref(), Some("/catalog/обувь"));
/// ```
pub fn url_path(url_str: &str) -> Option<String> {
    parse_lenient(url_str).ok().map(|url| decode(url.path()))
}

/// Percent-decodes a path or path segment; invalid UTF-8 is replaced
pub(crate) fn decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

/// Reduces a URL to its last path segment with the query stripped
///
/// This is the comparison key of the fuzzy category match: everything up to
/// and including the last `/` is dropped, then anything from `?` onwards.
///
/// # Examples
///
/// ```
/// use catalog_ingest::url::url_tail;
///
/// assert_eq!(url_tail("https://example.com/catalog/zhenshchinam/platya?sort=new"), "platya");
/// assert_eq!(url_tail("platya"), "platya");
/// assert_eq!(url_tail("/catalog/"), "");
/// ```
pub fn url_tail(url: &str) -> &str {
    let tail = match url.rfind('/') {
        Some(pos) => &url[pos + 1..],
        None => url,
    };

    match tail.find('?') {
        Some(pos) => &tail[..pos],
        None => tail,
    }
}
