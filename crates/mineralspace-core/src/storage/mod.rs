//! # Storage Backends
//!
//! `ReferenceStore` implementations: redb on disk, `BTreeMap` in memory.

mod memory;
mod redb_store;

pub use memory::MemoryReferenceStore;
pub use redb_store::RedbReferenceStore;
