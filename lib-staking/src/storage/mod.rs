//! Ledger Storage Layer
//!
//! This module defines the persistence contract for the staking ledger.
//! All durable state goes through the [`LedgerStore`] trait.
//!
//! # Data Model Invariants
//!
//! 1. **State writes are per-operation and atomic** - Every public ledger
//!    operation commits exactly one [`LedgerCommit`]; a commit is applied in
//!    full or not at all.
//!
//! 2. **A reopened store reproduces the ledger exactly** - Records, the
//!    stakeholder index, parameters, and the staked total all round-trip.
//!
//! 3. **Orchestration code does not know which backend is used** - The
//!    engine holds a `LedgerStore`, never a database handle.

pub mod sled_store;

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use lib_types::{Address, Amount};

use crate::params::StakingParams;
use crate::record::StakeRecord;

pub use sled_store::SledLedgerStore;

/// Error during ledger persistence operations
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Fixed meta-tree keys. These are protocol: changing them breaks
/// existing databases.
pub mod keys {
    pub const PARAMS: &[u8] = b"params";
    pub const TOTAL_STAKED: &[u8] = b"total_staked";
}

/// Complete durable state of the ledger, read once at open
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub params: StakingParams,
    pub records: HashMap<Address, StakeRecord>,
    pub stakeholders: BTreeSet<Address>,
    pub total_staked: Amount,
}

/// Dirty entries of one ledger operation, applied atomically.
///
/// Only what an operation touched is carried; absent fields leave the
/// stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct LedgerCommit {
    /// Records to upsert
    pub records: Vec<(Address, StakeRecord)>,
    /// Addresses entering the registered-stakeholder index
    pub index_insert: Vec<Address>,
    /// Addresses leaving the registered-stakeholder index
    pub index_remove: Vec<Address>,
    /// Replacement parameter set
    pub params: Option<StakingParams>,
    /// Replacement staked total
    pub total_staked: Option<Amount>,
}

/// Persistence contract for the staking ledger
pub trait LedgerStore {
    /// Load the stored snapshot, or `None` for a fresh database
    fn load(&self) -> StorageResult<Option<LedgerSnapshot>>;

    /// Apply one commit atomically and make it durable
    fn apply(&self, commit: &LedgerCommit) -> StorageResult<()>;
}
