//! Store capability and reference engine for docparity
//!
//! This crate provides:
//! - Store: the trait every engine under test is driven through
//! - MemoryStore: a bundled in-memory reference implementation
//! - Query evaluation helpers (filters, updates, pipelines, indexes)
//!
//! The reference store is not a semantic authority; it exists so both access
//! paths can be exercised end to end against the same engine.

#![warn(clippy::all)]

pub mod compare;
pub mod error;
pub mod filter;
pub mod index;
pub mod memory;
pub mod path;
pub mod pipeline;
pub mod seed;
pub mod store;
pub mod update;

use std::sync::Arc;

pub use error::{Result, StoreError};
pub use index::{default_index_name, IndexInfo, IndexSpec, ID_INDEX};
pub use memory::{MemoryStore, MEMORY_LOCATION};
pub use seed::SeedSnapshot;
pub use store::{FindAndModifyOptions, FindOptions, Store, UpdateOptions, UpdateResult};

/// Open the reference store at `location` as a shared [`Store`]
pub fn open(location: &str) -> Result<Arc<dyn Store>> {
    Ok(Arc::new(MemoryStore::open(location)?))
}
