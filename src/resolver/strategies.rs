//! Category lookup strategies
//!
//! Each strategy is a pure function over a [`CategoryLookup`]; the resolver
//! tries them in order.

use crate::category::CategoryNode;
use crate::resolver::{CategoryLookup, ResolveMethod};
use crate::url::url_path;

/// Signature shared by all lookup strategies
pub type LookupFn =
    for<'a> fn(&'a dyn CategoryLookup, &str, Option<&str>) -> Option<&'a CategoryNode>;

/// A named step of the fallback chain
#[derive(Clone, Copy)]
pub struct Strategy {
    pub method: ResolveMethod,
    pub lookup: LookupFn,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("method", &self.method)
            .finish()
    }
}

/// The default chain: exact URL, path-only URL, name, fuzzy URL
pub fn default_chain() -> Vec<Strategy> {
    vec![
        Strategy {
            method: ResolveMethod::ExactUrl,
            lookup: exact_url,
        },
        Strategy {
            method: ResolveMethod::UrlPath,
            lookup: path_only_url,
        },
        Strategy {
            method: ResolveMethod::Name,
            lookup: exact_name,
        },
        Strategy {
            method: ResolveMethod::FuzzyUrl,
            lookup: fuzzy_url,
        },
    ]
}

fn exact_url<'a>(
    index: &'a dyn CategoryLookup,
    url: &str,
    _name: Option<&str>,
) -> Option<&'a CategoryNode> {
    index.by_url(url)
}

fn path_only_url<'a>(
    index: &'a dyn CategoryLookup,
    url: &str,
    _name: Option<&str>,
) -> Option<&'a CategoryNode> {
    let path = url_path(url)?;
    if path == url {
        return None;
    }
    index.by_url(&path)
}

fn exact_name<'a>(
    index: &'a dyn CategoryLookup,
    _url: &str,
    name: Option<&str>,
) -> Option<&'a CategoryNode> {
    let name = name.filter(|n| !n.trim().is_empty())?;
    index.by_name(name)
}

fn fuzzy_url<'a>(
    index: &'a dyn CategoryLookup,
    url: &str,
    _name: Option<&str>,
) -> Option<&'a CategoryNode> {
    index.best_match_by_url(url)
}
