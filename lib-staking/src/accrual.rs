//! Accrual Engine (Pure Function)
//!
//! Time-weighted reward computation for stake records.
//!
//! # Rules (enforced in code)
//!
//! - Reward accrues only for whole elapsed accrual units; partial units are
//!   not credited until the next realization crosses a unit boundary
//! - Rounding is always floor, never up
//! - No floats - all arithmetic is integer, u128 internally
//! - Realization advances the record clock by exactly the realized units, so
//!   the fractional remainder of the current unit is preserved

use lib_types::{Amount, Bps, Timestamp};

use crate::errors::{StakeError, StakeResult};
use crate::params::BPS_SCALE;
use crate::record::StakeRecord;

/// One accrual unit: a day, in seconds
pub const ACCRUAL_UNIT_SECS: u64 = 86_400;

/// Whole accrual units elapsed between two instants. A clock that reads
/// earlier than the record's last realization yields zero.
pub fn elapsed_units(last: Timestamp, now: Timestamp) -> u64 {
    now.saturating_sub(last) / ACCRUAL_UNIT_SECS
}

/// Reward owed for `units` whole accrual units on `principal` at
/// `reward_rate` basis points per unit, rounded down.
pub fn pending_reward(principal: Amount, reward_rate: Bps, units: u64) -> StakeResult<Amount> {
    principal
        .checked_mul(u128::from(reward_rate))
        .and_then(|scaled| scaled.checked_mul(u128::from(units)))
        .map(|scaled| scaled / BPS_SCALE)
        .ok_or(StakeError::Overflow)
}

/// Pending reward for a record as of `now`, without mutating it
pub fn preview(record: &StakeRecord, reward_rate: Bps, now: Timestamp) -> StakeResult<Amount> {
    let units = elapsed_units(record.last_accrual_time, now);
    pending_reward(record.principal, reward_rate, units)
}

/// Realize pending accrual into the record's stored reward balance.
///
/// Adds the pending reward to `stake_reward` and advances
/// `last_accrual_time` by exactly the realized whole units, not to `now`,
/// so the fraction of the current unit keeps accruing. Calling again before
/// another unit boundary is a no-op. Returns the realized amount.
pub fn realize(record: &mut StakeRecord, reward_rate: Bps, now: Timestamp) -> StakeResult<Amount> {
    let units = elapsed_units(record.last_accrual_time, now);
    if units == 0 {
        return Ok(0);
    }

    let reward = pending_reward(record.principal, reward_rate, units)?;
    record.stake_reward = record
        .stake_reward
        .checked_add(reward)
        .ok_or(StakeError::Overflow)?;
    record.last_accrual_time = record
        .last_accrual_time
        .checked_add(units * ACCRUAL_UNIT_SECS)
        .ok_or(StakeError::Overflow)?;

    Ok(reward)
}
