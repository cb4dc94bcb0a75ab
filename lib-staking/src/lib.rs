//! Staking Ledger Engine
//!
//! A pool of one fungible token in which registered participants lock
//! principal to accrue time-weighted rewards. A one-level referral graph
//! pays a registrant's upline a share of the registration tax, and an
//! owner-gated parameter set governs the economics. Accrual is pull-based:
//! pending reward is realized lazily inside each mutating operation, never
//! by a background sweep.
//!
//! The fungible token itself is an external collaborator behind the
//! [`token::TokenLedger`] trait; durable state goes through
//! [`storage::LedgerStore`].

pub mod accrual;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod params;
pub mod record;
pub mod storage;
pub mod token;

// Re-export the operation surface for convenience
pub use errors::{StakeError, StakeResult};
pub use events::LedgerEvent;
pub use ledger::StakingLedger;
pub use params::{StakingParams, BPS_SCALE};
pub use record::StakeRecord;
pub use storage::{LedgerCommit, LedgerSnapshot, LedgerStore, SledLedgerStore, StorageError, StorageResult};
pub use token::{InMemoryToken, TokenError, TokenLedger};
