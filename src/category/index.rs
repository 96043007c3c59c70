//! Immutable category index
//!
//! Nodes are stored in an arena in document pre-order (parent before its
//! children, siblings in document order). On an id collision the later node
//! replaces the earlier one in place, keeping the earlier position.

use crate::category::node::{CategoryNode, TreeDocument};
use crate::url::url_tail;
use std::collections::{HashMap, HashSet};

/// Read-only views over a built category tree
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    nodes: Vec<CategoryNode>,
    by_id: HashMap<i64, usize>,
    by_url: HashMap<String, usize>,
    roots: Vec<i64>,
}

impl CategoryIndex {
    /// Builds an index from an ordered sequence of root-level documents
    ///
    /// # Arguments
    ///
    /// * `documents` - Root-level tree documents, in file order
    ///
    /// # Returns
    ///
    /// A fully built index; the root set is every indexed id that no other
    /// node lists as a child, sorted ascending.
    pub fn build(documents: Vec<TreeDocument>) -> Self {
        let mut index = Self::default();
        let mut url_occurrences: Vec<(String, i64)> = Vec::new();

        let mut stack: Vec<TreeDocument> = documents.into_iter().rev().collect();
        while let Some(doc) = stack.pop() {
            let TreeDocument {
                id,
                name,
                url,
                shard,
                query,
                childs,
            } = doc;

            if let Some(url) = &url {
                url_occurrences.push((url.clone(), id));
            }

            let node = CategoryNode {
                id,
                name,
                url,
                shard,
                query,
                children: childs.iter().map(|c| c.id).collect(),
            };

            match index.by_id.get(&id) {
                Some(&slot) => {
                    tracing::warn!("Duplicate category id {} in tree, keeping the later node", id);
                    index.nodes[slot] = node;
                }
                None => {
                    index.by_id.insert(id, index.nodes.len());
                    index.nodes.push(node);
                }
            }

            stack.extend(childs.into_iter().rev());
        }

        // Last occurrence wins, but only while the surviving node still owns the URL
        for (url, id) in url_occurrences {
            if let Some(&slot) = index.by_id.get(&id) {
                if index.nodes[slot].url.as_deref() == Some(url.as_str()) {
                    index.by_url.insert(url, slot);
                }
            }
        }

        let child_ids: HashSet<i64> = index
            .nodes
            .iter()
            .flat_map(|n| n.children.iter().copied())
            .collect();
        let mut roots: Vec<i64> = index
            .by_id
            .keys()
            .copied()
            .filter(|id| !child_ids.contains(id))
            .collect();
        roots.sort_unstable();
        index.roots = roots;

        index
    }

    /// Number of indexed categories
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the index holds no categories
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates all categories in index order
    pub fn nodes(&self) -> impl Iterator<Item = &CategoryNode> {
        self.nodes.iter()
    }

    /// Gets a category by id
    pub fn get_by_id(&self, id: i64) -> Option<&CategoryNode> {
        self.by_id.get(&id).map(|&slot| &self.nodes[slot])
    }

    /// Gets a category by exact URL
    pub fn get_by_url(&self, url: &str) -> Option<&CategoryNode> {
        self.by_url.get(url).map(|&slot| &self.nodes[slot])
    }

    /// Gets the children of a category; empty for unknown ids and leaves
    pub fn children(&self, id: i64) -> Vec<&CategoryNode> {
        self.get_by_id(id)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| self.get_by_id(*child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Gets the root categories sorted ascending by id
    pub fn roots(&self) -> Vec<&CategoryNode> {
        self.roots
            .iter()
            .filter_map(|id| self.get_by_id(*id))
            .collect()
    }

    /// Returns the first root-to-node path found by depth-first search
    ///
    /// Roots are searched in root order, children in document order. The
    /// path is empty when the id is unreachable from the root set.
    pub fn path_to(&self, id: i64) -> Vec<&CategoryNode> {
        let mut visited = HashSet::new();
        for root in self.roots() {
            let mut path = Vec::new();
            if self.find_path(root, id, &mut path, &mut visited) {
                return path;
            }
        }
        Vec::new()
    }

    fn find_path<'a>(
        &'a self,
        node: &'a CategoryNode,
        target: i64,
        path: &mut Vec<&'a CategoryNode>,
        visited: &mut HashSet<i64>,
    ) -> bool {
        if !visited.insert(node.id) {
            return false;
        }

        path.push(node);
        if node.id == target {
            return true;
        }

        for child in self.children(node.id) {
            if self.find_path(child, target, path, visited) {
                return true;
            }
        }

        path.pop();
        false
    }

    /// Finds the first category whose name equals `name`, ignoring case
    pub fn find_by_name(&self, name: &str) -> Option<&CategoryNode> {
        let wanted = name.to_lowercase();
        self.nodes.iter().find(|n| n.name.to_lowercase() == wanted)
    }

    /// Finds the category whose URL best overlaps `target_url`
    ///
    /// Both sides are reduced to their last path segment without query.
    /// A candidate matches when either reduced string contains the other; the
    /// score is the length of the contained one. The first candidate with the
    /// highest score wins.
    pub fn find_best_match_by_url(&self, target_url: &str) -> Option<&CategoryNode> {
        let target = url_tail(target_url);
        if target.is_empty() {
            return None;
        }

        let mut best: Option<(usize, &CategoryNode)> = None;
        for (slot, node) in self.nodes.iter().enumerate() {
            let Some(url) = node.url.as_deref() else {
                continue;
            };
            if self.by_url.get(url) != Some(&slot) {
                continue;
            }

            let candidate = url_tail(url);
            if candidate.is_empty() {
                continue;
            }

            let score = if target.contains(candidate) {
                candidate.len()
            } else if candidate.contains(target) {
                target.len()
            } else {
                continue;
            };

            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, node));
            }
        }

        best.map(|(_, node)| node)
    }
}
