//! Durability tests: a ledger reopened from the same database must
//! reproduce records, the stakeholder index, parameters, and totals exactly.

use anyhow::Result;

use lib_staking::{
    InMemoryToken, SledLedgerStore, StakeError, StakingLedger, StakingParams,
};
use lib_types::{Address, Timestamp};

const POOL: Address = Address::new([0xaa; 32]);
const OWNER: Address = Address::new([0xee; 32]);
const T0: Timestamp = 1_700_000_000;

fn addr(id: u8) -> Address {
    Address::new([id; 32])
}

fn funded_token() -> InMemoryToken {
    let mut token = InMemoryToken::new(POOL);
    for id in 1..=3 {
        token.mint(&addr(id), 10_000).unwrap();
    }
    token
}

#[test]
fn reopened_ledger_restores_records_index_and_totals() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("staking-db");

    {
        let mut ledger = StakingLedger::open(
            SledLedgerStore::open(&path)?,
            funded_token(),
            POOL,
            StakingParams::for_testing(OWNER),
        )?;
        ledger.register_and_stake(addr(1), Some(addr(2)), 1_200, T0)?;
        ledger.register_and_stake(addr(2), None, 2_000, T0)?;
        ledger.stake(addr(1), 1_000, T0)?;
        ledger.unstake(addr(2), 500, T0)?;
    }

    // The token collaborator settles balances elsewhere; only ledger state
    // lives in the database.
    let ledger = StakingLedger::open(
        SledLedgerStore::open(&path)?,
        funded_token(),
        POOL,
        StakingParams::for_testing(OWNER),
    )?;

    assert_eq!(ledger.record(&addr(1)).unwrap().principal, 1_960);
    assert_eq!(ledger.record(&addr(2)).unwrap().principal, 1_264);
    assert_eq!(ledger.record(&addr(2)).unwrap().referral_reward, 100);
    assert_eq!(ledger.total_staked(), 3_224);
    assert!(ledger.is_registered(&addr(1)));
    assert!(ledger.is_registered(&addr(2)));
    assert_eq!(ledger.stakeholders().count(), 2);
    Ok(())
}

#[test]
fn stored_params_win_over_constructor_params() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("staking-db");

    {
        let mut ledger = StakingLedger::open(
            SledLedgerStore::open(&path)?,
            funded_token(),
            POOL,
            StakingParams::for_testing(OWNER),
        )?;
        ledger.set_staking_tax_rate(&OWNER, 300)?;
        ledger.set_active(&OWNER, false)?;
    }

    // Reopen with a different parameter set; the stored one must win.
    let ledger = StakingLedger::open(
        SledLedgerStore::open(&path)?,
        funded_token(),
        POOL,
        StakingParams::default(),
    )?;

    assert_eq!(ledger.params().staking_tax_rate, 300);
    assert!(!ledger.params().active);
    assert_eq!(ledger.owner(), OWNER);
    Ok(())
}

#[test]
fn deregistered_rewards_survive_restart_and_stay_withdrawable() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("staking-db");

    {
        let mut ledger = StakingLedger::open(
            SledLedgerStore::open(&path)?,
            funded_token(),
            POOL,
            StakingParams::for_testing(OWNER),
        )?;
        ledger.register_and_stake(addr(1), Some(addr(3)), 1_200, T0)?;
        // Full exit: deregistered, referral bonus for addr(3) still owed.
        ledger.unstake(addr(1), 980, T0)?;
    }

    let mut token = funded_token();
    // Keep the pool solvent for the bonus payout after restart.
    token.mint(&POOL, 1_000).unwrap();
    let mut ledger =
        StakingLedger::open(SledLedgerStore::open(&path)?, token, POOL, StakingParams::for_testing(OWNER))?;

    assert!(!ledger.is_registered(&addr(1)));
    assert_eq!(ledger.record(&addr(3)).unwrap().referral_reward, 100);

    assert_eq!(ledger.withdraw_earnings(addr(3), T0)?, 100);
    assert!(matches!(
        ledger.withdraw_earnings(addr(3), T0),
        Err(StakeError::NothingToWithdraw)
    ));
    Ok(())
}

#[test]
fn accrual_clock_survives_restart() -> Result<()> {
    use lib_staking::accrual::ACCRUAL_UNIT_SECS;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("staking-db");

    {
        let mut ledger = StakingLedger::open(
            SledLedgerStore::open(&path)?,
            funded_token(),
            POOL,
            StakingParams::for_testing(OWNER),
        )?;
        ledger.register_and_stake(addr(1), None, 1_200, T0)?;
    }

    let ledger = StakingLedger::open(
        SledLedgerStore::open(&path)?,
        funded_token(),
        POOL,
        StakingParams::for_testing(OWNER),
    )?;

    // A restart does not advance or reset the accrual clock.
    assert_eq!(ledger.calculate_earnings(&addr(1), T0)?, 0);
    assert_eq!(
        ledger.calculate_earnings(&addr(1), T0 + ACCRUAL_UNIT_SECS)?,
        294
    );
    Ok(())
}
