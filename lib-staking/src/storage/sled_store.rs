//! Sled-based LedgerStore Implementation
//!
//! The only storage backend. Do not rely on sled-specific features beyond
//! basic KV + batches.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use sled::{Batch, Db, Tree};

use lib_types::{Address, Amount};

use crate::params::StakingParams;
use crate::record::StakeRecord;

use super::{keys, LedgerCommit, LedgerSnapshot, LedgerStore, StorageError, StorageResult};

// =============================================================================
// TREE NAMES (FIXED - DO NOT CHANGE)
// =============================================================================
// These names are protocol. Changing them breaks existing databases.
// =============================================================================

const TREE_RECORDS: &str = "records";
const TREE_STAKEHOLDERS: &str = "stakeholders";
const TREE_META: &str = "meta";

/// Sled-based implementation of [`LedgerStore`]
#[derive(Debug)]
pub struct SledLedgerStore {
    db: Db,

    // Trees (opened once, reused)
    records: Tree,
    stakeholders: Tree,
    meta: Tree,
}

impl SledLedgerStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path).map_err(|e| StorageError::Database(e.to_string()))?;
        Self::with_db(db)
    }

    /// Open a temporary store backed by scratch space, for tests and tooling
    pub fn open_temporary() -> StorageResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Self::with_db(db)
    }

    fn with_db(db: Db) -> StorageResult<Self> {
        let records = db
            .open_tree(TREE_RECORDS)
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let stakeholders = db
            .open_tree(TREE_STAKEHOLDERS)
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let meta = db
            .open_tree(TREE_META)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(Self {
            db,
            records,
            stakeholders,
            meta,
        })
    }

    /// Helper to serialize a value
    fn serialize<T: serde::Serialize>(value: &T) -> StorageResult<Vec<u8>> {
        bincode::serialize(value).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Helper to deserialize a value
    fn deserialize<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
        bincode::deserialize(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn address_from_key(bytes: &[u8]) -> StorageResult<Address> {
        let raw: [u8; 32] = bytes
            .try_into()
            .map_err(|_| StorageError::CorruptedData("invalid address key length".to_string()))?;
        Ok(Address::new(raw))
    }
}

impl LedgerStore for SledLedgerStore {
    fn load(&self) -> StorageResult<Option<LedgerSnapshot>> {
        // A database without parameters has never been initialized.
        let params: StakingParams = match self.meta.get(keys::PARAMS) {
            Ok(Some(bytes)) => Self::deserialize(&bytes)?,
            Ok(None) => return Ok(None),
            Err(e) => return Err(StorageError::Database(e.to_string())),
        };

        let total_staked: Amount = match self.meta.get(keys::TOTAL_STAKED) {
            Ok(Some(bytes)) => {
                if bytes.len() != 16 {
                    return Err(StorageError::CorruptedData(
                        "invalid total_staked length".to_string(),
                    ));
                }
                u128::from_be_bytes(bytes.as_ref().try_into().unwrap())
            }
            Ok(None) => 0,
            Err(e) => return Err(StorageError::Database(e.to_string())),
        };

        let mut records = HashMap::new();
        for entry in self.records.iter() {
            let (key, value) = entry.map_err(|e| StorageError::Database(e.to_string()))?;
            let addr = Self::address_from_key(&key)?;
            let record: StakeRecord = Self::deserialize(&value)?;
            records.insert(addr, record);
        }

        let mut stakeholders = BTreeSet::new();
        for entry in self.stakeholders.iter() {
            let (key, _) = entry.map_err(|e| StorageError::Database(e.to_string()))?;
            stakeholders.insert(Self::address_from_key(&key)?);
        }

        Ok(Some(LedgerSnapshot {
            params,
            records,
            stakeholders,
            total_staked,
        }))
    }

    fn apply(&self, commit: &LedgerCommit) -> StorageResult<()> {
        let mut record_batch = Batch::default();
        for (addr, record) in &commit.records {
            record_batch.insert(addr.as_bytes().as_ref(), Self::serialize(record)?);
        }

        let mut index_batch = Batch::default();
        for addr in &commit.index_insert {
            index_batch.insert(addr.as_bytes().as_ref(), Vec::new());
        }
        for addr in &commit.index_remove {
            index_batch.remove(addr.as_bytes().as_ref());
        }

        self.records
            .apply_batch(record_batch)
            .map_err(|e| StorageError::Database(e.to_string()))?;
        self.stakeholders
            .apply_batch(index_batch)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        if let Some(params) = &commit.params {
            self.meta
                .insert(keys::PARAMS, Self::serialize(params)?)
                .map_err(|e| StorageError::Database(e.to_string()))?;
        }
        if let Some(total) = commit.total_staked {
            self.meta
                .insert(keys::TOTAL_STAKED, total.to_be_bytes().to_vec())
                .map_err(|e| StorageError::Database(e.to_string()))?;
        }

        // Flush to ensure durability
        self.db
            .flush()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }
}
