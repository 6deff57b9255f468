//! # redb-backed Reference Storage
//!
//! A disk-backed `ReferenceStore` using the redb embedded database.
//!
//! redb gives us:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! The single-writer property is what makes `insert` safe: the existence
//! check and the write happen inside one write transaction, and redb
//! serializes write transactions, so two inserts for the same id can never
//! both succeed.

use crate::formats::{record_from_bytes, record_to_bytes};
use crate::store::ReferenceStore;
use crate::{MineralError, MineralId, MineralReference};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for references: MineralId string -> encoded record bytes
const REFERENCES: TableDefinition<&str, &[u8]> = TableDefinition::new("mineral_references");

fn storage_err(e: impl std::fmt::Display) -> MineralError {
    MineralError::Storage(e.to_string())
}

/// A disk-backed reference store using redb.
pub struct RedbReferenceStore {
    db: Database,
}

impl std::fmt::Debug for RedbReferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbReferenceStore").finish_non_exhaustive()
    }
}

impl RedbReferenceStore {
    /// Open or create a reference database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MineralError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Create the table up front so readers never see it missing.
        let write_txn = db.begin_write().map_err(storage_err)?;
        {
            let _ = write_txn.open_table(REFERENCES).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;

        Ok(Self { db })
    }
}

impl ReferenceStore for RedbReferenceStore {
    fn get(&self, id: &MineralId) -> Result<Option<MineralReference>, MineralError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(REFERENCES).map_err(storage_err)?;
        match table.get(id.as_str()).map_err(storage_err)? {
            Some(bytes) => record_from_bytes(bytes.value()).map(Some),
            None => Ok(None),
        }
    }

    fn insert(&self, record: &MineralReference) -> Result<(), MineralError> {
        let bytes = record_to_bytes(record)?;
        let key = record.id.as_str();

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        let inserted = {
            let mut table = write_txn.open_table(REFERENCES).map_err(storage_err)?;
            let exists = table.get(key).map_err(storage_err)?.is_some();
            if !exists {
                table.insert(key, bytes.as_slice()).map_err(storage_err)?;
            }
            !exists
        };

        if !inserted {
            write_txn.abort().map_err(storage_err)?;
            return Err(MineralError::Conflict(record.id.clone()));
        }
        write_txn.commit().map_err(storage_err)
    }

    fn list(&self) -> Result<Vec<MineralReference>, MineralError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(REFERENCES).map_err(storage_err)?;
        let mut records = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            let (_, value) = entry.map_err(storage_err)?;
            records.push(record_from_bytes(value.value())?);
        }
        Ok(records)
    }

    fn count(&self) -> Result<usize, MineralError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(REFERENCES).map_err(storage_err)?;
        let len = table.len().map_err(storage_err)?;
        Ok(len as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================
