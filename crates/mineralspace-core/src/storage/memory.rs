//! # In-Memory Reference Storage
//!
//! A volatile `ReferenceStore` backed by a `BTreeMap` behind an `RwLock`.
//! Used for tests and `--backend memory`. Same conflict semantics as the
//! redb backend: the write lock covers both the existence check and the
//! insert.

use crate::store::ReferenceStore;
use crate::{MineralError, MineralId, MineralReference};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Volatile reference store.
#[derive(Debug, Default)]
pub struct MemoryReferenceStore {
    records: RwLock<BTreeMap<MineralId, MineralReference>>,
}

impl MemoryReferenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records (later duplicates are dropped).
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = MineralReference>) -> Self {
        let mut map = BTreeMap::new();
        for record in records {
            map.entry(record.id.clone()).or_insert(record);
        }
        Self {
            records: RwLock::new(map),
        }
    }
}

fn poisoned<T>(_: T) -> MineralError {
    MineralError::Storage("reference store lock poisoned".to_string())
}

impl ReferenceStore for MemoryReferenceStore {
    fn get(&self, id: &MineralId) -> Result<Option<MineralReference>, MineralError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(id).cloned())
    }

    fn insert(&self, record: &MineralReference) -> Result<(), MineralError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&record.id) {
            return Err(MineralError::Conflict(record.id.clone()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<MineralReference>, MineralError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.values().cloned().collect())
    }

    fn count(&self) -> Result<usize, MineralError> {
        Ok(self.records.read().map_err(poisoned)?.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::ReferenceFields;
    use crate::store::{SeedOutcome, StoreSummary, seed_curated};
    use chrono::Utc;

    fn curated(key: &str, name: &str) -> MineralReference {
        MineralReference::curated(
            MineralId::parse(key).unwrap(),
            ReferenceFields {
                name_en: name.to_string(),
                ..ReferenceFields::default()
            },
        )
    }

    #[test]
    fn insert_conflict_does_not_overwrite() {
        let store = MemoryReferenceStore::new();
        store.insert(&curated("quartz", "Quartz")).unwrap();

        let err = store.insert(&curated("quartz", "Other")).unwrap_err();
        assert!(matches!(err, MineralError::Conflict(_)));

        let id = MineralId::parse("quartz").unwrap();
        assert_eq!(store.get(&id).unwrap().unwrap().name_en, "Quartz");
    }

    #[test]
    fn seeding_skips_existing_ids() {
        let store = MemoryReferenceStore::with_records([curated("quartz", "Quartz")]);

        let outcomes = seed_curated(
            &store,
            vec![curated("quartz", "Replacement"), curated("calcite", "Calcite")],
        )
        .unwrap();

        assert_eq!(
            outcomes,
            vec![
                SeedOutcome::Skipped(MineralId::parse("quartz").unwrap()),
                SeedOutcome::Inserted(MineralId::parse("calcite").unwrap()),
            ]
        );
        let quartz = store.get(&MineralId::parse("quartz").unwrap()).unwrap();
        assert_eq!(quartz.unwrap().name_en, "Quartz");
    }

    #[test]
    fn seeding_forces_curated_provenance() {
        let store = MemoryReferenceStore::new();
        let external = MineralReference::from_external(
            MineralId::external("Q1"),
            ReferenceFields::default(),
            Utc::now(),
        );
        seed_curated(&store, vec![external]).unwrap();

        let summary = StoreSummary::of(&store).unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.curated, 1);
        assert_eq!(summary.external, 0);
    }
}
