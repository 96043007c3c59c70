//! Category resolution module
//!
//! Turns a storefront category URL (and optionally its display name) into the
//! two routing parameters the catalog API needs. Index lookups are tried in a
//! fixed order; whatever they leave missing is filled from the structure of
//! the URL itself.

mod strategies;

pub use strategies::{default_chain, LookupFn, Strategy};

use crate::category::non_empty;
use crate::category::{CategoryIndex, CategoryNode};
use crate::url::extract_url_params;
use thiserror::Error;

/// Errors that can occur during category resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No category parameters found for {url}")]
    NotFound { url: String },

    #[error("Only partial category parameters found for {url}")]
    Incomplete { url: String },
}

/// Read access to categories as needed by the lookup strategies
pub trait CategoryLookup {
    /// Exact URL lookup
    fn by_url(&self, url: &str) -> Option<&CategoryNode>;

    /// Case-insensitive exact name lookup
    fn by_name(&self, name: &str) -> Option<&CategoryNode>;

    /// Fuzzy URL lookup
    fn best_match_by_url(&self, url: &str) -> Option<&CategoryNode>;
}

impl CategoryLookup for CategoryIndex {
    fn by_url(&self, url: &str) -> Option<&CategoryNode> {
        self.get_by_url(url)
    }

    fn by_name(&self, name: &str) -> Option<&CategoryNode> {
        self.find_by_name(name)
    }

    fn best_match_by_url(&self, url: &str) -> Option<&CategoryNode> {
        self.find_best_match_by_url(url)
    }
}

/// How a set of parameters was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveMethod {
    ExactUrl,
    UrlPath,
    Name,
    FuzzyUrl,
    /// No category found; parameters come from the URL alone
    UrlStructure,
}

impl std::fmt::Display for ResolveMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::ExactUrl => "exact url",
            Self::UrlPath => "url path",
            Self::Name => "category name",
            Self::FuzzyUrl => "fuzzy url",
            Self::UrlStructure => "url structure",
        };
        f.write_str(label)
    }
}

/// Routing parameters for one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryParams {
    pub shard: Option<String>,
    pub query: Option<String>,

    /// Lookup that produced the category (or `UrlStructure`)
    pub method: ResolveMethod,

    /// Id of the matched category, if any
    pub category_id: Option<i64>,
}

impl CategoryParams {
    /// Returns true if both parameters are present and non-empty
    pub fn is_complete(&self) -> bool {
        non_empty(&self.shard).is_some() && non_empty(&self.query).is_some()
    }

    /// Returns both parameters when complete
    pub fn pair(&self) -> Option<(&str, &str)> {
        Some((non_empty(&self.shard)?, non_empty(&self.query)?))
    }
}

/// Resolves category URLs through an ordered list of lookup strategies
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    strategies: Vec<Strategy>,
}

impl Default for CategoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryResolver {
    /// Creates a resolver with the default fallback chain
    pub fn new() -> Self {
        Self::with_strategies(default_chain())
    }

    /// Creates a resolver with a custom chain
    pub fn with_strategies(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// Resolves `(shard, query)` for a category URL
    ///
    /// Strategies run in order and the first category carrying both
    /// parameters wins. When none does, the first category found at all is
    /// merged with parameters extracted from the URL structure, index values
    /// taking precedence. The result may be partial; only when neither source
    /// yields anything is the category reported as not found.
    ///
    /// # Arguments
    ///
    /// * `index` - Category lookups to consult
    /// * `url` - Storefront category URL
    /// * `name` - Optional display name of the category
    ///
    /// # Returns
    ///
    /// * `Ok(CategoryParams)` - Complete or partial parameters
    /// * `Err(ResolveError::NotFound)` - No parameter could be found
    pub fn resolve(
        &self,
        index: &dyn CategoryLookup,
        url: &str,
        name: Option<&str>,
    ) -> Result<CategoryParams, ResolveError> {
        let mut partial: Option<(ResolveMethod, &CategoryNode)> = None;

        for strategy in &self.strategies {
            let Some(node) = (strategy.lookup)(index, url, name) else {
                tracing::trace!("No category via {} for {}", strategy.method, url);
                continue;
            };

            if node.has_params() {
                tracing::debug!(
                    "Resolved {} to category {} '{}' via {}",
                    url,
                    node.id,
                    node.name,
                    strategy.method
                );
                return Ok(CategoryParams {
                    shard: node.shard.clone(),
                    query: node.query.clone(),
                    method: strategy.method,
                    category_id: Some(node.id),
                });
            }

            tracing::debug!(
                "Category {} '{}' found via {} lacks routing parameters",
                node.id,
                node.name,
                strategy.method
            );
            if partial.is_none() {
                partial = Some((strategy.method, node));
            }
        }

        let from_url = extract_url_params(url);
        let params = match partial {
            Some((method, node)) => CategoryParams {
                shard: non_empty(&node.shard).map(str::to_string).or(from_url.shard),
                query: non_empty(&node.query).map(str::to_string).or(from_url.query),
                method,
                category_id: Some(node.id),
            },
            None => CategoryParams {
                shard: from_url.shard,
                query: from_url.query,
                method: ResolveMethod::UrlStructure,
                category_id: None,
            },
        };

        if params.shard.is_none() && params.query.is_none() {
            tracing::warn!("No category parameters found for {}", url);
            return Err(ResolveError::NotFound {
                url: url.to_string(),
            });
        }

        tracing::info!(
            "Resolved {} via {}: shard={:?}, query={:?}",
            url,
            params.method,
            params.shard,
            params.query
        );
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::TreeDocument;

    fn node(id: i64, name: &str, url: &str, shard: Option<&str>, query: Option<&str>) -> CategoryNode {
        CategoryNode {
            id,
            name: name.to_string(),
            url: Some(url.to_string()),
            shard: shard.map(str::to_string),
            query: query.map(str::to_string),
            children: vec![],
        }
    }

    /// Answers exact URL lookups only; any other lookup fails the test
    struct ExactOnly {
        node: CategoryNode,
    }

    impl CategoryLookup for ExactOnly {
        fn by_url(&self, url: &str) -> Option<&CategoryNode> {
            (self.node.url.as_deref() == Some(url)).then_some(&self.node)
        }

        fn by_name(&self, _name: &str) -> Option<&CategoryNode> {
            panic!("name lookup must not be consulted");
        }

        fn best_match_by_url(&self, _url: &str) -> Option<&CategoryNode> {
            panic!("fuzzy lookup must not be consulted");
        }
    }

    fn doc(id: i64, name: &str, url: Option<&str>, shard: Option<&str>, query: Option<&str>) -> TreeDocument {
        TreeDocument {
            id,
            name: name.to_string(),
            url: url.map(str::to_string),
            shard: shard.map(str::to_string),
            query: query.map(str::to_string),
            childs: vec![],
        }
    }

    #[test]
    fn test_exact_url_short_circuits_chain() {
        let index = ExactOnly {
            node: node(7, "Bags", "https://shop.example/catalog/bags", Some("bags"), Some("cat=7")),
        };
        let params = CategoryResolver::new()
            .resolve(&index, "https://shop.example/catalog/bags", Some("Bags"))
            .unwrap();

        assert_eq!(params.pair(), Some(("bags", "cat=7")));
        assert_eq!(params.method, ResolveMethod::ExactUrl);
    }

    #[test]
    fn test_end_to_end_tree() {
        let mut root = doc(1, "Root", Some("/root"), None, None);
        root.childs.push(doc(2, "Leaf", Some("/root/leaf"), Some("s1"), Some("cat=5")));
        let index = CategoryIndex::build(vec![root]);

        let params = CategoryResolver::new()
            .resolve(&index, "/root/leaf", Some("Leaf"))
            .unwrap();

        assert_eq!(params.pair(), Some(("s1", "cat=5")));
        assert_eq!(params.method, ResolveMethod::ExactUrl);
        assert_eq!(params.category_id, Some(2));
    }

    #[test]
    fn test_path_only_lookup() {
        let index = CategoryIndex::build(vec![doc(3, "Hats", Some("/catalog/hats"), Some("hats"), Some("cat=3"))]);
        let params = CategoryResolver::new()
            .resolve(&index, "https://www.shop.example/catalog/hats?sort=popular", None)
            .unwrap();

        assert_eq!(params.method, ResolveMethod::UrlPath);
        assert_eq!(params.pair(), Some(("hats", "cat=3")));
    }

    #[test]
    fn test_path_only_lookup_with_non_ascii_path() {
        let index = CategoryIndex::build(vec![
            doc(9, "Обувь", Some("/catalog/обувь"), Some("shoes"), Some("cat=9")),
            doc(10, "Детская обувь", Some("/catalog/детям/обувь"), Some("kids"), Some("cat=10")),
        ]);
        let params = CategoryResolver::new()
            .resolve(&index, "https://www.shop.example/catalog/обувь", None)
            .unwrap();

        assert_eq!(params.method, ResolveMethod::UrlPath);
        assert_eq!(params.category_id, Some(9));
        assert_eq!(params.pair(), Some(("shoes", "cat=9")));
    }

    #[test]
    fn test_name_lookup_before_fuzzy() {
        let index = CategoryIndex::build(vec![
            doc(4, "Scarves", Some("/catalog/accessories/scarves"), Some("acc"), Some("cat=40")),
            doc(5, "Winter Scarves", Some("/catalog/winter"), Some("win"), Some("cat=50")),
        ]);
        let params = CategoryResolver::new()
            .resolve(&index, "/somewhere/scarves", Some("winter scarves"))
            .unwrap();

        assert_eq!(params.method, ResolveMethod::Name);
        assert_eq!(params.category_id, Some(5));
    }

    #[test]
    fn test_fuzzy_lookup_last() {
        let index = CategoryIndex::build(vec![doc(
            4,
            "Scarves",
            Some("/catalog/accessories/scarves"),
            Some("acc"),
            Some("cat=40"),
        )]);
        let params = CategoryResolver::new()
            .resolve(&index, "/somewhere/scarves", Some("Unknown"))
            .unwrap();

        assert_eq!(params.method, ResolveMethod::FuzzyUrl);
        assert_eq!(params.category_id, Some(4));
    }

    #[test]
    fn test_incomplete_category_filled_from_url() {
        let index = CategoryIndex::build(vec![doc(
            8,
            "Jeans",
            Some("https://shop.example/catalog/jeans?subject=11"),
            None,
            Some("subject=11"),
        )]);
        let params = CategoryResolver::new()
            .resolve(&index, "https://shop.example/catalog/jeans?subject=11", None)
            .unwrap();

        assert_eq!(params.method, ResolveMethod::ExactUrl);
        assert_eq!(params.shard.as_deref(), Some("jeans"));
        assert_eq!(params.query.as_deref(), Some("subject=11"));
    }

    #[test]
    fn test_url_structure_without_category() {
        let index = CategoryIndex::build(vec![]);
        let params = CategoryResolver::new()
            .resolve(&index, "https://shop.example/catalog/socks?kind=2", None)
            .unwrap();

        assert_eq!(params.method, ResolveMethod::UrlStructure);
        assert_eq!(params.pair(), Some(("socks", "kind=2")));
    }

    #[test]
    fn test_partial_result_is_returned() {
        let index = CategoryIndex::build(vec![]);
        let params = CategoryResolver::new()
            .resolve(&index, "https://shop.example/catalog/socks", None)
            .unwrap();

        assert_eq!(params.shard.as_deref(), Some("socks"));
        assert_eq!(params.query, None);
        assert!(!params.is_complete());
    }

    #[test]
    fn test_not_found() {
        let index = CategoryIndex::build(vec![doc(1, "Root", Some("/root"), None, None)]);
        let result = CategoryResolver::new().resolve(&index, "https://shop.example/brands/x", None);
        assert!(matches!(result, Err(ResolveError::NotFound { .. })));
    }
}
