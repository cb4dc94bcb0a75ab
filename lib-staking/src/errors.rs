//! Staking Ledger Errors

use thiserror::Error;
use lib_types::{Amount, Bps};

use crate::storage::StorageError;

/// Error during staking ledger operations
#[derive(Error, Debug, Clone)]
pub enum StakeError {
    #[error("staker must be registered")]
    NotRegistered,

    #[error("staker is already registered")]
    AlreadyRegistered,

    #[error("ledger is paused")]
    ContractPaused,

    #[error("amount is below minimum stake value: minimum {minimum}, got {actual}")]
    BelowMinimumStake { minimum: Amount, actual: Amount },

    #[error("must have enough balance to stake")]
    InsufficientBalance,

    #[error("insufficient stake to unstake: have {available}, requested {requested}")]
    InsufficientStake {
        available: Amount,
        requested: Amount,
    },

    #[error("no reward to withdraw")]
    NothingToWithdraw,

    #[error("token transfer failed")]
    TransferFailed,

    #[error("caller is not the owner")]
    NotOwner,

    #[error("pool reserve is sufficient: reserve {reserve}, threshold {threshold}")]
    PoolReserveSufficient { reserve: Amount, threshold: Amount },

    #[error("rate exceeds 100%: {rate} bps")]
    InvalidRate { rate: Bps },

    #[error("arithmetic overflow")]
    Overflow,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for staking ledger operations
pub type StakeResult<T> = Result<T, StakeError>;
