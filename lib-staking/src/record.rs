//! Per-Stakeholder Records

use serde::{Deserialize, Serialize};

use lib_types::{Amount, Timestamp};

use crate::errors::{StakeError, StakeResult};

/// Ledger state for one account identity
///
/// # Invariants
///
/// - `principal == 0` if and only if `registered == false`
/// - `stake_reward` and `referral_reward` only grow through accrual and
///   referral credits, and only reset to exactly 0 through a successful
///   withdrawal
/// - `last_accrual_time` never moves backwards, and only advances by whole
///   accrual units
///
/// Reward and referral fields survive deregistration: realized earnings stay
/// owed and withdrawable after the holder unstakes everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeRecord {
    /// Currently staked, reward-bearing balance
    pub principal: Amount,
    /// True from registration until the principal drains to zero
    pub registered: bool,
    /// Last point at which pending accrual was realized into `stake_reward`
    pub last_accrual_time: Timestamp,
    /// Realized, unwithdrawn accrual reward
    pub stake_reward: Amount,
    /// Realized, unwithdrawn referral bonus earned as a referrer
    pub referral_reward: Amount,
    /// Distinct referees that registered naming this record as referrer
    pub referral_count: u32,
}

impl StakeRecord {
    /// Fresh record for an identity that has never interacted with the pool
    pub fn empty() -> Self {
        Self {
            principal: 0,
            registered: false,
            last_accrual_time: 0,
            stake_reward: 0,
            referral_reward: 0,
            referral_count: 0,
        }
    }

    /// Total realized earnings owed to this record
    pub fn total_earnings(&self) -> StakeResult<Amount> {
        self.stake_reward
            .checked_add(self.referral_reward)
            .ok_or(StakeError::Overflow)
    }
}
