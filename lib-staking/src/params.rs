//! Ledger Parameters
//!
//! The owner-governed economic configuration of the staking pool. All rates
//! are basis points (10000 = 100%); flat amounts are token units. Parameter
//! changes take effect for subsequent operations only; accrual already
//! realized is never recomputed.

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount, Bps};

use crate::errors::{StakeError, StakeResult};

/// Basis-point denominator for all rate math (10000 = 100%)
pub const BPS_SCALE: u128 = 10_000;

/// Owner-mutable economic parameters of the staking ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    /// Owner identity, checked on every administrative call
    pub owner: Address,
    /// Tax on incoming stake amounts, in basis points
    pub staking_tax_rate: Bps,
    /// Tax on outgoing unstake amounts, in basis points
    pub unstaking_tax_rate: Bps,
    /// Reward per accrual unit per unit of principal, in basis points
    pub reward_rate: Bps,
    /// Flat tax deducted from every registration deposit
    pub registration_tax: Amount,
    /// Share of the registration tax routed to the referrer, in basis points
    pub referral_allocation: Bps,
    /// Minimum amount for any single stake, and minimum post-tax
    /// registration remainder
    pub minimum_stake: Amount,
    /// Free-reserve level above which pool replenishment is rejected
    pub pool_reserve_threshold: Amount,
    /// Gates registration and staking; unstake and withdraw stay available
    pub active: bool,
}

impl StakingParams {
    /// Validate cross-field constraints. Every rate must stay within 100%.
    pub fn validate(&self) -> StakeResult<()> {
        for rate in [
            self.staking_tax_rate,
            self.unstaking_tax_rate,
            self.reward_rate,
            self.referral_allocation,
        ] {
            check_rate(rate)?;
        }
        Ok(())
    }

    /// Parameters matching the reference deployment, used by the test suites
    /// to pin exact numeric outcomes.
    pub fn for_testing(owner: Address) -> Self {
        Self {
            owner,
            staking_tax_rate: 200,     // 2%
            unstaking_tax_rate: 400,   // 4%
            reward_rate: 3_000,        // 30% per accrual unit
            registration_tax: 200,
            referral_allocation: 5_000, // 50% of the registration tax
            minimum_stake: 1_000,
            pool_reserve_threshold: 10_000,
            active: true,
        }
    }
}

impl Default for StakingParams {
    fn default() -> Self {
        Self {
            owner: Address::zero(),
            staking_tax_rate: 200,
            unstaking_tax_rate: 400,
            reward_rate: 100, // 1% per accrual unit
            registration_tax: 200,
            referral_allocation: 5_000,
            minimum_stake: 1_000,
            pool_reserve_threshold: 10_000,
            active: true,
        }
    }
}

/// Reject rates above 100%
pub fn check_rate(rate: Bps) -> StakeResult<()> {
    if u128::from(rate) > BPS_SCALE {
        return Err(StakeError::InvalidRate { rate });
    }
    Ok(())
}

/// Basis-point share of an amount, rounded down
pub fn bps_of(amount: Amount, rate: Bps) -> StakeResult<Amount> {
    amount
        .checked_mul(u128::from(rate))
        .map(|scaled| scaled / BPS_SCALE)
        .ok_or(StakeError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(StakingParams::default().validate().is_ok());
        assert!(StakingParams::for_testing(Address::zero()).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_rate_above_100_percent() {
        let mut params = StakingParams::default();
        params.referral_allocation = 10_001;
        assert!(matches!(
            params.validate(),
            Err(StakeError::InvalidRate { rate: 10_001 })
        ));
    }

    #[test]
    fn test_bps_of_rounds_down() {
        // 2% of 1000 = 20
        assert_eq!(bps_of(1_000, 200).unwrap(), 20);
        // 4% of 980 = 39.2 -> 39
        assert_eq!(bps_of(980, 400).unwrap(), 39);
        // 100% is the identity
        assert_eq!(bps_of(12_345, 10_000).unwrap(), 12_345);
        assert_eq!(bps_of(999, 0).unwrap(), 0);
    }

    #[test]
    fn test_bps_of_overflow_is_an_error() {
        assert!(matches!(
            bps_of(Amount::MAX, 10_000),
            Err(StakeError::Overflow)
        ));
    }
}
