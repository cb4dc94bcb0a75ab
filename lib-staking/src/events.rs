//! Ledger Event Records
//!
//! Every committed state transition produces one event, recorded in order by
//! the orchestrator and exposed read-only. Events are an audit trail for
//! embedders; they are not ledger state and are not persisted.

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount, Timestamp};

/// State transitions observable on the staking ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A new stakeholder registered and made the initial stake
    Registered {
        staker: Address,
        referrer: Option<Address>,
        principal: Amount,
        timestamp: Timestamp,
    },

    /// An existing stakeholder added to their principal
    Staked {
        staker: Address,
        amount: Amount,
        tax: Amount,
        timestamp: Timestamp,
    },

    /// A stakeholder withdrew principal; `payout` is the post-tax amount paid
    Unstaked {
        staker: Address,
        amount: Amount,
        payout: Amount,
        timestamp: Timestamp,
    },

    /// Realized earnings were paid out and reset
    Withdrawn {
        staker: Address,
        amount: Amount,
        timestamp: Timestamp,
    },

    /// The owner replenished the pool reserve
    PoolSupplied { amount: Amount },

    /// The owner swept pool funds to an external account
    AdminWithdrawn { to: Address, amount: Amount },

    /// The owner changed an economic parameter
    ParamChanged { name: String, value: Amount },

    /// Ledger ownership moved to a new identity
    OwnershipTransferred { from: Address, to: Address },
}
