use crate::category::index::CategoryIndex;
use crate::category::node::TreeDocument;
use crate::IngestError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Loads and builds a category index from a tree document file
///
/// # Arguments
///
/// * `path` - Path to the JSON tree document (an array of root nodes)
///
/// # Returns
///
/// * `Ok(CategoryIndex)` - Successfully built index
/// * `Err(IngestError)` - The file could not be read or is not a tree document
pub fn load_index(path: &Path) -> Result<CategoryIndex, IngestError> {
    let content = std::fs::read_to_string(path).map_err(|source| IngestError::CategoryTree {
        path: path.display().to_string(),
        source,
    })?;

    let documents: Vec<TreeDocument> = serde_json::from_str(&content)?;
    let index = CategoryIndex::build(documents);

    tracing::info!(
        "Loaded {} categories ({} roots) from {}",
        index.len(),
        index.roots().len(),
        path.display()
    );

    Ok(index)
}

/// Shared handle to the current category index
///
/// Readers take an `Arc` snapshot with [`IndexHandle::current`] and keep
/// using it for the whole operation. A reload builds a complete new index
/// first and only then swaps the pointer, so no reader ever sees a partially
/// built index.
#[derive(Debug)]
pub struct IndexHandle {
    source: Option<PathBuf>,
    current: RwLock<Arc<CategoryIndex>>,
}

impl IndexHandle {
    /// Wraps an already built index; such a handle cannot reload from disk
    pub fn new(index: CategoryIndex) -> Self {
        Self {
            source: None,
            current: RwLock::new(Arc::new(index)),
        }
    }

    /// Loads the index from a tree document file and remembers the path for reloads
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let index = load_index(path)?;
        Ok(Self {
            source: Some(path.to_path_buf()),
            current: RwLock::new(Arc::new(index)),
        })
    }

    /// Returns a snapshot of the current index
    pub fn current(&self) -> Arc<CategoryIndex> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    /// Replaces the current index wholesale
    pub fn replace(&self, index: CategoryIndex) {
        let fresh = Arc::new(index);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = fresh;
    }

    /// Rebuilds the index from its source file
    ///
    /// On failure the previous index stays in place.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of categories in the new index
    /// * `Err(IngestError)` - The source could not be loaded
    pub fn reload(&self) -> Result<usize, IngestError> {
        let Some(path) = &self.source else {
            tracing::debug!("Index handle has no source file, nothing to reload");
            return Ok(self.current().len());
        };

        let index = load_index(path)?;
        let count = index.len();
        self.replace(index);
        tracing::info!("Category index reloaded ({} categories)", count);
        Ok(count)
    }
}
