use serde::Deserialize;

/// One node of the category tree document as stored on disk
///
/// Children are nested under `childs`, recursively. Routing parameters are
/// optional: many intermediate nodes carry only a name.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeDocument {
    pub id: i64,

    pub name: String,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub shard: Option<String>,

    #[serde(default)]
    pub query: Option<String>,

    #[serde(default)]
    pub childs: Vec<TreeDocument>,
}

/// A category as held by the index
///
/// Nodes live in the index arena; `children` lists child ids in document
/// order and is resolved through the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    /// Unique category id
    pub id: i64,

    /// Display name
    pub name: String,

    /// Storefront URL, absolute or host-relative
    pub url: Option<String>,

    /// Upstream routing segment
    pub shard: Option<String>,

    /// Upstream scoping parameters
    pub query: Option<String>,

    /// Child ids in document order
    pub children: Vec<i64>,
}

impl CategoryNode {
    /// Returns true if the node carries both non-empty routing parameters
    pub fn has_params(&self) -> bool {
        non_empty(&self.shard).is_some() && non_empty(&self.query).is_some()
    }

    /// Returns true if the node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Treats empty strings as absent
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
