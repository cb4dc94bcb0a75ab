//! Token Collaborator Boundary
//!
//! The ledger never moves funds itself: it asks a [`TokenLedger`] to debit
//! and credit the pool, and treats every call as fallible. The transfer is
//! always the last step of an operation, so a refusal aborts the operation
//! with no ledger state committed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lib_types::{Address, Amount};

/// Error from the token collaborator
#[derive(Error, Debug, Clone)]
pub enum TokenError {
    #[error("insufficient token balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("token balance overflow")]
    Overflow,
}

/// The fungible-token transfer primitive the ledger depends on.
///
/// Implementations carry the pool's own account: `transfer_in` credits the
/// pool from `from`, `transfer_out` debits the pool to `to`. Both are atomic
/// debit/credit pairs: on error no balance has moved.
pub trait TokenLedger {
    /// Move `amount` from `from` into the pool
    fn transfer_in(&mut self, from: &Address, amount: Amount) -> Result<(), TokenError>;

    /// Move `amount` from the pool to `to`
    fn transfer_out(&mut self, to: &Address, amount: Amount) -> Result<(), TokenError>;

    /// Current balance of any account, zero when unknown
    fn balance_of(&self, addr: &Address) -> Amount;
}

/// In-memory fungible token, used by the test suites and by embedders that
/// settle balances elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryToken {
    pool: Address,
    balances: HashMap<Address, Amount>,
}

impl InMemoryToken {
    /// New token ledger whose pool account is `pool`
    pub fn new(pool: Address) -> Self {
        Self {
            pool,
            balances: HashMap::new(),
        }
    }

    /// Credit an account out of thin air. Test and genesis setup only.
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let balance = self.balance_of(to);
        let updated = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        self.balances.insert(*to, updated);
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let source = self.balance_of(from);
        if source < amount {
            return Err(TokenError::InsufficientBalance {
                have: source,
                need: amount,
            });
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.balances.insert(*from, source - amount);
        self.balances.insert(*to, credited);
        Ok(())
    }
}

impl TokenLedger for InMemoryToken {
    fn transfer_in(&mut self, from: &Address, amount: Amount) -> Result<(), TokenError> {
        let pool = self.pool;
        self.transfer(from, &pool, amount)
    }

    fn transfer_out(&mut self, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let pool = self.pool;
        self.transfer(&pool, to, amount)
    }

    fn balance_of(&self, addr: &Address) -> Amount {
        self.balances.get(addr).copied().unwrap_or(0)
    }
}
