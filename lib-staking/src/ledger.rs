//! Staking Ledger Orchestrator
//!
//! The public operation surface of the pool: registration, staking,
//! unstaking, earnings withdrawal, and the owner-gated administrative
//! surface. Every operation runs as one atomic unit against the ledger
//! state: validations first, the token transfer as the last fallible
//! external step, then a single storage commit. A failure at any point
//! leaves both the in-memory state and the database exactly as they were.
//!
//! Accrual is pull-based: there is no background distribution job. Each
//! mutating operation realizes the caller's pending reward before applying
//! its own effect, and `calculate_earnings` previews accrual read-only.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};

use lib_types::{Address, Amount, Bps, Timestamp};

use crate::accrual;
use crate::errors::{StakeError, StakeResult};
use crate::events::LedgerEvent;
use crate::params::{bps_of, check_rate, StakingParams};
use crate::record::StakeRecord;
use crate::storage::{LedgerCommit, LedgerStore};
use crate::token::TokenLedger;

/// The staking pool state machine
///
/// Holds the authoritative runtime state (records, registered-stakeholder
/// index, staked total) and writes every committed operation through its
/// [`LedgerStore`]. Funds move only through the [`TokenLedger`]
/// collaborator; the pool's own token account is `pool`.
pub struct StakingLedger<T: TokenLedger, S: LedgerStore> {
    store: S,
    token: T,
    pool: Address,
    params: StakingParams,
    records: HashMap<Address, StakeRecord>,
    stakeholders: BTreeSet<Address>,
    total_staked: Amount,
    events: Vec<LedgerEvent>,
}

impl<T: TokenLedger, S: LedgerStore> StakingLedger<T, S> {
    /// Open the ledger, hydrating from the store when it holds a snapshot.
    ///
    /// Stored parameters win over `params`; the constructor's parameter set
    /// only seeds a fresh database. A stored staked total that disagrees
    /// with the sum of stored principals is rejected as corruption.
    pub fn open(store: S, token: T, pool: Address, params: StakingParams) -> StakeResult<Self> {
        params.validate()?;

        let (params, records, stakeholders, total_staked, fresh) = match store.load()? {
            Some(snapshot) => (
                snapshot.params,
                snapshot.records,
                snapshot.stakeholders,
                snapshot.total_staked,
                false,
            ),
            None => (params, HashMap::new(), BTreeSet::new(), 0, true),
        };

        let summed = records
            .values()
            .try_fold(0 as Amount, |acc, r| acc.checked_add(r.principal))
            .ok_or(StakeError::Overflow)?;
        if summed != total_staked {
            return Err(StakeError::Storage(crate::storage::StorageError::CorruptedData(
                format!(
                    "stored total_staked {} disagrees with summed principals {}",
                    total_staked, summed
                ),
            )));
        }

        let ledger = Self {
            store,
            token,
            pool,
            params,
            records,
            stakeholders,
            total_staked,
            events: Vec::new(),
        };

        if fresh {
            ledger.store.apply(&LedgerCommit {
                params: Some(ledger.params.clone()),
                total_staked: Some(0),
                ..LedgerCommit::default()
            })?;
            info!(owner = %ledger.params.owner, "staking ledger initialized");
        } else {
            info!(
                stakeholders = ledger.stakeholders.len(),
                total_staked = ledger.total_staked,
                "staking ledger restored"
            );
        }

        Ok(ledger)
    }

    // =========================================================================
    // Stakeholder Operations
    // =========================================================================

    /// Register the caller and place the initial stake in one step.
    ///
    /// The registration tax is deducted from the deposit and retained by the
    /// pool; the staking tax then applies to the remainder, and what is left
    /// becomes the initial principal. A referrer that is neither null nor
    /// the caller earns the configured share of the registration tax and a
    /// referral-count credit. The referrer does not need to be registered.
    ///
    /// Re-registration after a full unstake starts a fresh principal while
    /// earnings and referral credits from the prior registration persist.
    pub fn register_and_stake(
        &mut self,
        caller: Address,
        referrer: Option<Address>,
        deposit: Amount,
        now: Timestamp,
    ) -> StakeResult<()> {
        if self.records.get(&caller).map_or(false, |r| r.registered) {
            return Err(StakeError::AlreadyRegistered);
        }
        if !self.params.active {
            return Err(StakeError::ContractPaused);
        }

        let registration_tax = self.params.registration_tax;
        let floor = registration_tax
            .checked_add(self.params.minimum_stake)
            .ok_or(StakeError::Overflow)?;
        if deposit < floor {
            return Err(StakeError::BelowMinimumStake {
                minimum: self.params.minimum_stake,
                actual: deposit.saturating_sub(registration_tax),
            });
        }

        let remainder = deposit - registration_tax;
        let staking_tax = bps_of(remainder, self.params.staking_tax_rate)?;
        let principal = remainder - staking_tax;
        let new_total = self
            .total_staked
            .checked_add(principal)
            .ok_or(StakeError::Overflow)?;

        // Earnings from a prior registration survive; only the stake itself
        // and the accrual clock start over.
        let mut record = self
            .records
            .get(&caller)
            .cloned()
            .unwrap_or_else(StakeRecord::empty);
        record.principal = principal;
        record.registered = true;
        record.last_accrual_time = now;

        let mut touched = Vec::with_capacity(2);
        let referrer = referrer.filter(|r| *r != caller && !r.is_zero());
        if let Some(upline) = referrer {
            let bonus = bps_of(registration_tax, self.params.referral_allocation)?;
            let mut upline_record = self
                .records
                .get(&upline)
                .cloned()
                .unwrap_or_else(StakeRecord::empty);
            upline_record.referral_reward = upline_record
                .referral_reward
                .checked_add(bonus)
                .ok_or(StakeError::Overflow)?;
            upline_record.referral_count += 1;
            touched.push((upline, upline_record));
        }
        touched.push((caller, record));

        self.token
            .transfer_in(&caller, deposit)
            .map_err(|_| StakeError::InsufficientBalance)?;

        self.store.apply(&LedgerCommit {
            records: touched.clone(),
            index_insert: vec![caller],
            total_staked: Some(new_total),
            ..LedgerCommit::default()
        })?;

        for (addr, updated) in touched {
            self.records.insert(addr, updated);
        }
        self.stakeholders.insert(caller);
        self.total_staked = new_total;

        info!(staker = %caller, principal, deposit, "stakeholder registered");
        self.events.push(LedgerEvent::Registered {
            staker: caller,
            referrer,
            principal,
            timestamp: now,
        });
        Ok(())
    }

    /// Add to the caller's principal.
    ///
    /// Realizes pending accrual first, then applies the staking tax to the
    /// incoming amount; the tax stays in the pool.
    pub fn stake(&mut self, caller: Address, amount: Amount, now: Timestamp) -> StakeResult<()> {
        let mut record = self.registered_record(&caller)?;
        if !self.params.active {
            return Err(StakeError::ContractPaused);
        }
        if amount < self.params.minimum_stake {
            return Err(StakeError::BelowMinimumStake {
                minimum: self.params.minimum_stake,
                actual: amount,
            });
        }

        let realized = accrual::realize(&mut record, self.params.reward_rate, now)?;

        let tax = bps_of(amount, self.params.staking_tax_rate)?;
        let net = amount - tax;
        record.principal = record
            .principal
            .checked_add(net)
            .ok_or(StakeError::Overflow)?;
        let new_total = self
            .total_staked
            .checked_add(net)
            .ok_or(StakeError::Overflow)?;

        self.token
            .transfer_in(&caller, amount)
            .map_err(|_| StakeError::InsufficientBalance)?;

        self.store.apply(&LedgerCommit {
            records: vec![(caller, record.clone())],
            total_staked: Some(new_total),
            ..LedgerCommit::default()
        })?;

        self.records.insert(caller, record);
        self.total_staked = new_total;

        debug!(staker = %caller, realized, "accrual realized on stake");
        info!(staker = %caller, amount, tax, "stake added");
        self.events.push(LedgerEvent::Staked {
            staker: caller,
            amount,
            tax,
            timestamp: now,
        });
        Ok(())
    }

    /// Withdraw principal from the pool.
    ///
    /// The unstaking tax is retained by the pool and the post-tax amount is
    /// paid out. Principal and the staked total shrink by the pre-tax
    /// amount. Draining the principal to zero deregisters the caller while
    /// realized earnings persist. Available while the ledger is paused.
    pub fn unstake(&mut self, caller: Address, amount: Amount, now: Timestamp) -> StakeResult<()> {
        let mut record = self.registered_record(&caller)?;
        if amount > record.principal {
            return Err(StakeError::InsufficientStake {
                available: record.principal,
                requested: amount,
            });
        }

        let realized = accrual::realize(&mut record, self.params.reward_rate, now)?;

        let tax = bps_of(amount, self.params.unstaking_tax_rate)?;
        let payout = amount - tax;
        let new_total = self
            .total_staked
            .checked_sub(amount)
            .ok_or(StakeError::Overflow)?;
        record.principal -= amount;

        let deregistered = record.principal == 0;
        if deregistered {
            record.registered = false;
        }

        self.token.transfer_out(&caller, payout).map_err(|e| {
            warn!(staker = %caller, payout, error = %e, "pool unable to cover unstake payout");
            StakeError::TransferFailed
        })?;

        self.store.apply(&LedgerCommit {
            records: vec![(caller, record.clone())],
            index_remove: if deregistered { vec![caller] } else { Vec::new() },
            total_staked: Some(new_total),
            ..LedgerCommit::default()
        })?;

        self.records.insert(caller, record);
        self.total_staked = new_total;
        if deregistered {
            self.stakeholders.remove(&caller);
            info!(staker = %caller, "stakeholder deregistered");
        }

        debug!(staker = %caller, realized, "accrual realized on unstake");
        info!(staker = %caller, amount, payout, "stake withdrawn");
        self.events.push(LedgerEvent::Unstaked {
            staker: caller,
            amount,
            payout,
            timestamp: now,
        });
        Ok(())
    }

    /// Pay out all realized earnings (accrual reward plus referral bonus)
    /// and reset them, along with the referral count, to zero.
    ///
    /// The only precondition is a non-zero earnings balance, so rewards that
    /// persisted past deregistration remain withdrawable. Available while
    /// the ledger is paused. Returns the amount paid.
    pub fn withdraw_earnings(&mut self, caller: Address, now: Timestamp) -> StakeResult<Amount> {
        let mut record = self
            .records
            .get(&caller)
            .cloned()
            .unwrap_or_else(StakeRecord::empty);
        if record.registered {
            accrual::realize(&mut record, self.params.reward_rate, now)?;
        }

        let earnings = record.total_earnings()?;
        if earnings == 0 {
            return Err(StakeError::NothingToWithdraw);
        }

        record.stake_reward = 0;
        record.referral_reward = 0;
        record.referral_count = 0;

        self.token.transfer_out(&caller, earnings).map_err(|e| {
            warn!(staker = %caller, earnings, error = %e, "pool unable to cover earnings payout");
            StakeError::TransferFailed
        })?;

        self.store.apply(&LedgerCommit {
            records: vec![(caller, record.clone())],
            ..LedgerCommit::default()
        })?;
        self.records.insert(caller, record);

        info!(staker = %caller, earnings, "earnings withdrawn");
        self.events.push(LedgerEvent::Withdrawn {
            staker: caller,
            amount: earnings,
            timestamp: now,
        });
        Ok(earnings)
    }

    /// Preview the pending (unrealized) accrual for an identity as of `now`.
    /// Read-only; repeated calls with an unchanged clock return the same
    /// value.
    pub fn calculate_earnings(&self, addr: &Address, now: Timestamp) -> StakeResult<Amount> {
        match self.records.get(addr) {
            Some(record) => accrual::preview(record, self.params.reward_rate, now),
            None => Ok(0),
        }
    }

    // =========================================================================
    // Administrative Operations (owner-gated)
    // =========================================================================

    pub fn set_staking_tax_rate(&mut self, caller: &Address, rate: Bps) -> StakeResult<()> {
        self.require_owner(caller)?;
        check_rate(rate)?;
        let mut params = self.params.clone();
        params.staking_tax_rate = rate;
        self.commit_params(params, "staking_tax_rate", Amount::from(rate))
    }

    pub fn set_unstaking_tax_rate(&mut self, caller: &Address, rate: Bps) -> StakeResult<()> {
        self.require_owner(caller)?;
        check_rate(rate)?;
        let mut params = self.params.clone();
        params.unstaking_tax_rate = rate;
        self.commit_params(params, "unstaking_tax_rate", Amount::from(rate))
    }

    /// Change the accrual rate. Takes effect for subsequent realizations
    /// only; reward already realized is never recomputed.
    pub fn set_reward_rate(&mut self, caller: &Address, rate: Bps) -> StakeResult<()> {
        self.require_owner(caller)?;
        check_rate(rate)?;
        let mut params = self.params.clone();
        params.reward_rate = rate;
        self.commit_params(params, "reward_rate", Amount::from(rate))
    }

    pub fn set_registration_tax(&mut self, caller: &Address, tax: Amount) -> StakeResult<()> {
        self.require_owner(caller)?;
        let mut params = self.params.clone();
        params.registration_tax = tax;
        self.commit_params(params, "registration_tax", tax)
    }

    pub fn set_referral_allocation(&mut self, caller: &Address, rate: Bps) -> StakeResult<()> {
        self.require_owner(caller)?;
        check_rate(rate)?;
        let mut params = self.params.clone();
        params.referral_allocation = rate;
        self.commit_params(params, "referral_allocation", Amount::from(rate))
    }

    pub fn set_minimum_stake(&mut self, caller: &Address, minimum: Amount) -> StakeResult<()> {
        self.require_owner(caller)?;
        let mut params = self.params.clone();
        params.minimum_stake = minimum;
        self.commit_params(params, "minimum_stake", minimum)
    }

    pub fn set_pool_reserve_threshold(
        &mut self,
        caller: &Address,
        threshold: Amount,
    ) -> StakeResult<()> {
        self.require_owner(caller)?;
        let mut params = self.params.clone();
        params.pool_reserve_threshold = threshold;
        self.commit_params(params, "pool_reserve_threshold", threshold)
    }

    /// Pause or resume registration and staking. Unstaking and earnings
    /// withdrawal stay available regardless; the escape hatch never closes.
    pub fn set_active(&mut self, caller: &Address, active: bool) -> StakeResult<()> {
        self.require_owner(caller)?;
        let mut params = self.params.clone();
        params.active = active;
        self.commit_params(params, "active", Amount::from(active))
    }

    /// Hand the administrative surface to a new owner identity
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> StakeResult<()> {
        self.require_owner(caller)?;
        let previous = self.params.owner;
        let mut params = self.params.clone();
        params.owner = new_owner;

        self.store.apply(&LedgerCommit {
            params: Some(params.clone()),
            ..LedgerCommit::default()
        })?;
        self.params = params;

        info!(from = %previous, to = %new_owner, "ledger ownership transferred");
        self.events.push(LedgerEvent::OwnershipTransferred {
            from: previous,
            to: new_owner,
        });
        Ok(())
    }

    /// Replenish the pool from the owner's token balance.
    ///
    /// Rejected while the free reserve (pool balance minus staked
    /// obligations) still exceeds the configured threshold.
    pub fn supply_pool(&mut self, caller: &Address, amount: Amount) -> StakeResult<()> {
        self.require_owner(caller)?;

        let reserve = self.pool_reserve();
        if reserve > self.params.pool_reserve_threshold {
            return Err(StakeError::PoolReserveSufficient {
                reserve,
                threshold: self.params.pool_reserve_threshold,
            });
        }

        self.token
            .transfer_in(caller, amount)
            .map_err(|_| StakeError::InsufficientBalance)?;

        info!(amount, "pool reserve replenished");
        self.events.push(LedgerEvent::PoolSupplied { amount });
        Ok(())
    }

    /// Sweep pool funds to an arbitrary account. There is no
    /// stakeholder-obligation check; keeping the pool solvent is the
    /// owner's responsibility.
    pub fn admin_withdraw(
        &mut self,
        caller: &Address,
        to: Address,
        amount: Amount,
    ) -> StakeResult<()> {
        self.require_owner(caller)?;

        self.token.transfer_out(&to, amount).map_err(|e| {
            warn!(to = %to, amount, error = %e, "admin sweep failed");
            StakeError::TransferFailed
        })?;

        info!(to = %to, amount, "pool funds swept");
        self.events.push(LedgerEvent::AdminWithdrawn { to, amount });
        Ok(())
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Record for an identity, if it ever interacted with the pool
    pub fn record(&self, addr: &Address) -> Option<&StakeRecord> {
        self.records.get(addr)
    }

    /// Whether an identity is currently a registered stakeholder
    pub fn is_registered(&self, addr: &Address) -> bool {
        self.records.get(addr).map_or(false, |r| r.registered)
    }

    /// Sum of all principals in the pool
    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    /// Currently-registered stakeholders in address order
    pub fn stakeholders(&self) -> impl Iterator<Item = &Address> {
        self.stakeholders.iter()
    }

    pub fn params(&self) -> &StakingParams {
        &self.params
    }

    pub fn owner(&self) -> Address {
        self.params.owner
    }

    pub fn pool_address(&self) -> Address {
        self.pool
    }

    /// Token balance held by the pool account
    pub fn pool_balance(&self) -> Amount {
        self.token.balance_of(&self.pool)
    }

    /// Pool balance not backing staked principal
    pub fn pool_reserve(&self) -> Amount {
        self.pool_balance().saturating_sub(self.total_staked)
    }

    /// Events recorded since this ledger handle was opened, oldest first
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn registered_record(&self, addr: &Address) -> StakeResult<StakeRecord> {
        self.records
            .get(addr)
            .filter(|r| r.registered)
            .cloned()
            .ok_or(StakeError::NotRegistered)
    }

    fn require_owner(&self, caller: &Address) -> StakeResult<()> {
        if *caller != self.params.owner {
            return Err(StakeError::NotOwner);
        }
        Ok(())
    }

    fn commit_params(
        &mut self,
        params: StakingParams,
        name: &str,
        value: Amount,
    ) -> StakeResult<()> {
        self.store.apply(&LedgerCommit {
            params: Some(params.clone()),
            ..LedgerCommit::default()
        })?;
        self.params = params;

        info!(param = name, value, "ledger parameter updated");
        self.events.push(LedgerEvent::ParamChanged {
            name: name.to_string(),
            value,
        });
        Ok(())
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
