//! # mineralspace-core
//!
//! The mineral reference model for MineralSpace - THE LOGIC.
//!
//! This crate owns everything about a reference record that does not need a
//! network or a runtime:
//! - `types`: identifiers, records, specimen views, errors
//! - `entity`: typed view of raw Wikidata entities
//! - `normalizer`: raw entity -> reference fields (pure, total)
//! - `store`: the append-only `ReferenceStore` contract
//! - `storage`: redb and in-memory backends
//! - `formats`: versioned record encoding
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies (pure Rust)
//! - A persisted record is never overwritten; `insert` reports `Conflict`
//! - Fetching, deduplication and reconciliation live in the app crate's
//!   resolver, which is the only consumer of `Conflict`

// =============================================================================
// MODULES
// =============================================================================

pub mod entity;
pub mod formats;
pub mod normalizer;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use types::{
    EXTERNAL_PREFIX, MAX_ID_LENGTH, MineralError, MineralId, MineralReference, ReferenceFields,
    ReferenceSource, SpecimenRecord, SpecimenView,
};

pub use entity::{Claim, DataValue, EntityRef, Label, RawEntity, Snak};
pub use normalizer::normalize;
pub use storage::{MemoryReferenceStore, RedbReferenceStore};
pub use store::{ReferenceStore, SeedOutcome, StoreSummary, seed_curated};
