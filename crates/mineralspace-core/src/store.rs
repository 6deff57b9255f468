//! # Reference Store
//!
//! The `ReferenceStore` trait is the single shared mutable resource of the
//! resolution pipeline: a durable map from `MineralId` to `MineralReference`
//! with a uniqueness constraint on the key.
//!
//! `insert` never overwrites. When a record with the same id already exists
//! it returns `MineralError::Conflict`, and the caller decides what to do
//! (the resolver re-reads and returns the winner).

use crate::{MineralError, MineralId, MineralReference, ReferenceSource};

/// Durable, append-only storage for reference records.
///
/// Implementations must be safe to share across threads. The check for an
/// existing id and the write in `insert` must be atomic with respect to
/// other inserts, including inserts from other processes sharing the same
/// backing store.
pub trait ReferenceStore: Send + Sync {
    /// Get a record by id.
    fn get(&self, id: &MineralId) -> Result<Option<MineralReference>, MineralError>;

    /// Insert a new record. Fails with `Conflict` if the id exists.
    fn insert(&self, record: &MineralReference) -> Result<(), MineralError>;

    /// All records, ordered by id.
    fn list(&self) -> Result<Vec<MineralReference>, MineralError>;

    /// Number of stored records.
    fn count(&self) -> Result<usize, MineralError>;
}

/// Record counts grouped by provenance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub total: usize,
    pub curated: usize,
    pub external: usize,
}

impl StoreSummary {
    /// Summarize the contents of a store.
    pub fn of(store: &dyn ReferenceStore) -> Result<Self, MineralError> {
        let mut summary = Self::default();
        for record in store.list()? {
            summary.total += 1;
            match record.source {
                ReferenceSource::Curated => summary.curated += 1,
                ReferenceSource::Wikidata => summary.external += 1,
            }
        }
        Ok(summary)
    }
}

/// Result of seeding one curated record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Inserted(MineralId),
    Skipped(MineralId),
}

/// Insert curated records, skipping ids that already exist.
///
/// Existing rows are left untouched; seeding never overwrites.
pub fn seed_curated(
    store: &dyn ReferenceStore,
    records: Vec<MineralReference>,
) -> Result<Vec<SeedOutcome>, MineralError> {
    let mut outcomes = Vec::with_capacity(records.len());
    for record in records {
        let record = record.into_curated();
        match store.insert(&record) {
            Ok(()) => outcomes.push(SeedOutcome::Inserted(record.id)),
            Err(MineralError::Conflict(id)) => outcomes.push(SeedOutcome::Skipped(id)),
            Err(e) => return Err(e),
        }
    }
    Ok(outcomes)
}
