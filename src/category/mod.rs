//! Category tree module
//!
//! This module materializes the static category tree document into an
//! immutable, id-keyed index and provides the handle through which readers
//! observe it across reloads:
//! - Tree document deserialization
//! - Id, URL and root indexes
//! - Exact, name and fuzzy URL lookups
//! - Atomic index replacement

mod handle;
mod index;
mod node;

pub use handle::{load_index, IndexHandle};
pub use index::CategoryIndex;
pub use node::{CategoryNode, TreeDocument};

pub(crate) use node::non_empty;
