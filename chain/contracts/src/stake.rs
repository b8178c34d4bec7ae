//! Stake Ledger: proportional reward distribution with a lazy accumulator
//!
//! Stakers lock the stake token in the pool account; authorized depositors
//! (the auction house escrow, typically) feed rewards in the reward token.
//! A deposit only bumps the global `acc_reward_per_share`; nothing iterates
//! over stakers. Each position keeps a `reward_debt` snapshot of what it had
//! accrued at its last settlement, so
//!
//! ```text
//! pending = banked + staked * acc_reward_per_share / SCALE - reward_debt
//! ```
//!
//! Pending reward is banked whenever a position changes size, so nothing is
//! lost or double counted across stake and unstake.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::ids::AccountId;
use types::numeric::Amount;

use crate::config::{EmptyPoolPolicy, StakeConfig};
use crate::errors::StakeError;
use crate::events::{ContractEvent, RewardDeposited, RewardWithdrawn, Staked, Unstaked};
use crate::ledger::FungibleLedger;
use crate::security::{AccessControl, Action, Authorizer, ReentrancyGuard};

/// Fixed-point scale of `acc_reward_per_share`.
///
/// Each deposit adds `floor(amount * SCALE / total_staked)`, so a staker
/// loses less than `staked / SCALE` base units per deposit to truncation.
/// With 18-decimal tokens a billion-token position loses under 10^-3 tokens
/// per deposit. The product `total_staked * acc_reward_per_share` must fit in
/// a `u128`; stakes and deposits that would break that are rejected with
/// `Overflow`.
pub const ACC_REWARD_SCALE: u128 = 1_000_000_000_000;

/// A staker's position. Created on first stake, never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePosition {
    pub staker: AccountId,
    pub staked_amount: Amount,
    /// `staked_amount * acc / SCALE` at the last settlement
    pub reward_debt: u128,
    /// Reward settled out of the accumulator but not yet withdrawn
    pub banked_reward: Amount,
}

impl StakePosition {
    fn new(staker: AccountId) -> Self {
        Self {
            staker,
            staked_amount: 0,
            reward_debt: 0,
            banked_reward: 0,
        }
    }
}

/// Global pool accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PoolState {
    acc_reward_per_share: u128,
    total_staked: Amount,
    /// Deposits held while nothing was staked, plus truncation remainder
    undistributed_reward: Amount,
    total_rewards_deposited: Amount,
    total_rewards_paid: Amount,
}

fn accrued(staked: Amount, acc_reward_per_share: u128) -> Result<u128, StakeError> {
    staked
        .checked_mul(acc_reward_per_share)
        .map(|v| v / ACC_REWARD_SCALE)
        .ok_or(StakeError::Overflow)
}

/// Stake-weighted reward ledger.
#[derive(Debug)]
pub struct StakeLedger<A = AccessControl> {
    config: StakeConfig,
    /// Account holding staked principal and undistributed rewards
    pool: AccountId,
    positions: HashMap<AccountId, StakePosition>,
    state: PoolState,
    reentrancy_guard: ReentrancyGuard,
    authorizer: A,
    /// Emitted events log (append-only)
    events: Vec<ContractEvent>,
}

impl StakeLedger<AccessControl> {
    /// Create a ledger administered by `admin` through role-based access control.
    pub fn new(admin: AccountId, config: StakeConfig) -> Self {
        Self::with_authorizer(config, AccessControl::new(admin))
    }
}

impl<A: Authorizer> StakeLedger<A> {
    pub fn with_authorizer(config: StakeConfig, authorizer: A) -> Self {
        let pool = AccountId::new();
        info!(
            %pool,
            stake_token = %config.stake_token,
            reward_token = %config.reward_token,
            "StakeLedger initialized"
        );
        Self {
            config,
            pool,
            positions: HashMap::new(),
            state: PoolState::default(),
            reentrancy_guard: ReentrancyGuard::new(),
            authorizer,
            events: Vec::new(),
        }
    }

    // ───────────────────────── Stake / Unstake ─────────────────────────

    /// Lock `amount` of the stake token. The staker must have approved the
    /// pool account for at least `amount`.
    pub fn stake(
        &mut self,
        staker: AccountId,
        amount: Amount,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, StakeError> {
        if amount == 0 {
            return Err(StakeError::InvalidAmount);
        }
        self.check_reentrancy()?;
        let result = self.stake_inner(staker, amount, ledger);
        self.reentrancy_guard.release();
        result
    }

    fn stake_inner(
        &mut self,
        staker: AccountId,
        amount: Amount,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, StakeError> {
        let previous = self.positions.get(&staker).cloned();
        let mut position = previous.clone().unwrap_or_else(|| StakePosition::new(staker));
        let mut state = self.state;

        self.bank_pending(&mut position)?;
        position.staked_amount = position
            .staked_amount
            .checked_add(amount)
            .ok_or(StakeError::Overflow)?;
        state.total_staked = state
            .total_staked
            .checked_add(amount)
            .ok_or(StakeError::Overflow)?;
        accrued(state.total_staked, state.acc_reward_per_share)?;
        position.reward_debt = accrued(position.staked_amount, state.acc_reward_per_share)?;
        // Rewards parked while the pool was empty go to the first stakers in.
        if self.state.total_staked == 0 {
            Self::distribute(&mut state, 0)?;
        }

        let snapshot = self.state;
        self.state = state;
        self.positions.insert(staker, position);

        let transfer = ledger.transfer_from(
            &self.config.stake_token,
            &self.pool,
            &staker,
            &self.pool,
            amount,
        );
        if let Err(e) = transfer {
            self.restore(staker, previous, snapshot);
            return Err(e.into());
        }

        debug!(%staker, amount, total_staked = self.state.total_staked, "Staked");
        Ok(self.emit(ContractEvent::Staked(Staked {
            staker,
            amount,
            total_staked: self.state.total_staked,
        })))
    }

    /// Return `amount` of staked principal to the staker.
    pub fn unstake(
        &mut self,
        staker: AccountId,
        amount: Amount,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, StakeError> {
        if amount == 0 {
            return Err(StakeError::InvalidAmount);
        }
        self.check_reentrancy()?;
        let result = self.unstake_inner(staker, amount, ledger);
        self.reentrancy_guard.release();
        result
    }

    fn unstake_inner(
        &mut self,
        staker: AccountId,
        amount: Amount,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, StakeError> {
        let previous = self.positions.get(&staker).cloned();
        let mut position = previous.clone().unwrap_or_else(|| StakePosition::new(staker));
        if position.staked_amount < amount {
            return Err(StakeError::InsufficientStake {
                requested: amount,
                staked: position.staked_amount,
            });
        }

        self.bank_pending(&mut position)?;
        position.staked_amount -= amount;
        position.reward_debt = accrued(position.staked_amount, self.state.acc_reward_per_share)?;

        let snapshot = self.state;
        self.state.total_staked -= amount;
        self.positions.insert(staker, position);

        let transfer = ledger.transfer(&self.config.stake_token, &self.pool, &staker, amount);
        if let Err(e) = transfer {
            self.restore(staker, previous, snapshot);
            return Err(e.into());
        }

        debug!(%staker, amount, total_staked = self.state.total_staked, "Unstaked");
        Ok(self.emit(ContractEvent::Unstaked(Unstaked {
            staker,
            amount,
            total_staked: self.state.total_staked,
        })))
    }

    // ───────────────────────── Rewards ─────────────────────────

    /// Feed `amount` of the reward token from `depositor` into the pool.
    ///
    /// O(1) regardless of the number of stakers. With nothing staked the
    /// configured [`EmptyPoolPolicy`] decides between rejecting and holding
    /// the reward for the next stakers.
    pub fn deposit_reward(
        &mut self,
        depositor: AccountId,
        amount: Amount,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, StakeError> {
        if amount == 0 {
            return Err(StakeError::InvalidAmount);
        }
        if !self.authorizer.is_authorized(&depositor, Action::DepositReward) {
            warn!(%depositor, "Rejected reward deposit from unauthorized account");
            return Err(StakeError::Unauthorized);
        }
        self.check_reentrancy()?;
        let result = self.deposit_reward_inner(depositor, amount, ledger);
        self.reentrancy_guard.release();
        result
    }

    fn deposit_reward_inner(
        &mut self,
        depositor: AccountId,
        amount: Amount,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, StakeError> {
        let deferred = self.state.total_staked == 0;
        if deferred && self.config.empty_pool_policy == EmptyPoolPolicy::Reject {
            return Err(StakeError::NoStakers);
        }

        let mut state = self.state;
        state.total_rewards_deposited = state
            .total_rewards_deposited
            .checked_add(amount)
            .ok_or(StakeError::Overflow)?;
        Self::distribute(&mut state, amount)?;

        let snapshot = self.state;
        self.state = state;

        let transfer = ledger.transfer(&self.config.reward_token, &depositor, &self.pool, amount);
        if let Err(e) = transfer {
            self.state = snapshot;
            return Err(e.into());
        }

        if deferred {
            warn!(%depositor, amount, "Reward deposited with nothing staked; holding until stake exists");
        } else {
            debug!(
                %depositor,
                amount,
                acc_reward_per_share = self.state.acc_reward_per_share,
                "Reward deposited"
            );
        }
        Ok(self.emit(ContractEvent::RewardDeposited(RewardDeposited {
            depositor,
            amount,
            acc_reward_per_share: self.state.acc_reward_per_share,
            deferred,
        })))
    }

    /// Pay out everything pending for `staker`.
    pub fn withdraw_reward(
        &mut self,
        staker: AccountId,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, StakeError> {
        self.check_reentrancy()?;
        let result = self.withdraw_reward_inner(staker, ledger);
        self.reentrancy_guard.release();
        result
    }

    fn withdraw_reward_inner(
        &mut self,
        staker: AccountId,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, StakeError> {
        let Some(previous) = self.positions.get(&staker).cloned() else {
            return Err(StakeError::NoReward);
        };
        let mut position = previous.clone();
        self.bank_pending(&mut position)?;
        // Per-position truncation can round a claim up by a base unit; never
        // pay out more than the reward actually held. Any shortfall stays banked.
        let payout = position.banked_reward.min(self.reward_reserve());
        if payout == 0 {
            return Err(StakeError::NoReward);
        }
        position.banked_reward -= payout;

        let snapshot = self.state;
        self.state.total_rewards_paid = self
            .state
            .total_rewards_paid
            .checked_add(payout)
            .ok_or(StakeError::Overflow)?;
        self.positions.insert(staker, position);

        let transfer = ledger.transfer(&self.config.reward_token, &self.pool, &staker, payout);
        if let Err(e) = transfer {
            self.restore(staker, Some(previous), snapshot);
            return Err(e.into());
        }

        info!(%staker, amount = payout, "Reward withdrawn");
        Ok(self.emit(ContractEvent::RewardWithdrawn(RewardWithdrawn {
            staker,
            amount: payout,
        })))
    }

    // ───────────────────────── Queries ─────────────────────────

    /// `banked + staked * acc / SCALE - reward_debt`
    pub fn pending_reward(&self, staker: &AccountId) -> Amount {
        self.positions.get(staker).map_or(0, |p| {
            let accrued = p.staked_amount.saturating_mul(self.state.acc_reward_per_share)
                / ACC_REWARD_SCALE;
            p.banked_reward
                .saturating_add(accrued.saturating_sub(p.reward_debt))
        })
    }

    pub fn position(&self, staker: &AccountId) -> Option<&StakePosition> {
        self.positions.get(staker)
    }

    pub fn positions(&self) -> impl Iterator<Item = &StakePosition> {
        self.positions.values()
    }

    pub fn staked_amount(&self, staker: &AccountId) -> Amount {
        self.positions.get(staker).map_or(0, |p| p.staked_amount)
    }

    pub fn total_staked(&self) -> Amount {
        self.state.total_staked
    }

    pub fn acc_reward_per_share(&self) -> u128 {
        self.state.acc_reward_per_share
    }

    /// Reward held back: deposits made while the pool was empty plus
    /// truncation remainder. Folded in on the next deposit, or on the first
    /// stake into an empty pool.
    pub fn undistributed_reward(&self) -> Amount {
        self.state.undistributed_reward
    }

    pub fn total_rewards_deposited(&self) -> Amount {
        self.state.total_rewards_deposited
    }

    pub fn total_rewards_paid(&self) -> Amount {
        self.state.total_rewards_paid
    }

    /// Reward held by the pool and already credited to the accumulator.
    pub fn reward_reserve(&self) -> Amount {
        self.state
            .total_rewards_deposited
            .saturating_sub(self.state.total_rewards_paid)
            .saturating_sub(self.state.undistributed_reward)
    }

    pub fn pool_account(&self) -> AccountId {
        self.pool
    }

    pub fn config(&self) -> &StakeConfig {
        &self.config
    }

    pub fn authorizer(&self) -> &A {
        &self.authorizer
    }

    pub fn authorizer_mut(&mut self) -> &mut A {
        &mut self.authorizer
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &[ContractEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ContractEvent> {
        std::mem::take(&mut self.events)
    }

    // ───────────────────────── Internal ─────────────────────────

    /// Move accrued-but-unsettled reward into `banked_reward`.
    fn bank_pending(&self, position: &mut StakePosition) -> Result<(), StakeError> {
        let accrued = accrued(position.staked_amount, self.state.acc_reward_per_share)?;
        let pending = accrued
            .checked_sub(position.reward_debt)
            .ok_or(StakeError::Overflow)?;
        position.banked_reward = position
            .banked_reward
            .checked_add(pending)
            .ok_or(StakeError::Overflow)?;
        position.reward_debt = accrued;
        Ok(())
    }

    /// Spread `amount` plus anything undistributed over current stake.
    ///
    /// The credited share is rounded up and the remainder kept in
    /// `undistributed_reward`, so the carry never overstates what is left.
    fn distribute(state: &mut PoolState, amount: Amount) -> Result<(), StakeError> {
        let available = state
            .undistributed_reward
            .checked_add(amount)
            .ok_or(StakeError::Overflow)?;
        if state.total_staked == 0 || available == 0 {
            state.undistributed_reward = available;
            return Ok(());
        }

        let increment = available
            .checked_mul(ACC_REWARD_SCALE)
            .ok_or(StakeError::Overflow)?
            / state.total_staked;
        let acc = state
            .acc_reward_per_share
            .checked_add(increment)
            .ok_or(StakeError::Overflow)?;
        accrued(state.total_staked, acc)?;

        let distributed = state
            .total_staked
            .checked_mul(increment)
            .ok_or(StakeError::Overflow)?
            .div_ceil(ACC_REWARD_SCALE);
        state.acc_reward_per_share = acc;
        state.undistributed_reward = available - distributed;
        Ok(())
    }

    fn restore(&mut self, staker: AccountId, previous: Option<StakePosition>, state: PoolState) {
        match previous {
            Some(position) => self.positions.insert(staker, position),
            None => self.positions.remove(&staker),
        };
        self.state = state;
    }

    fn emit(&mut self, event: ContractEvent) -> ContractEvent {
        self.events.push(event.clone());
        event
    }

    fn check_reentrancy(&mut self) -> Result<(), StakeError> {
        if !self.reentrancy_guard.acquire() {
            return Err(StakeError::Reentrancy);
        }
        Ok(())
    }
}

/// Destination for auction reward shares.
pub trait RewardSink {
    fn deposit_reward(
        &mut self,
        depositor: AccountId,
        amount: Amount,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, StakeError>;
}

impl<A: Authorizer> RewardSink for StakeLedger<A> {
    fn deposit_reward(
        &mut self,
        depositor: AccountId,
        amount: Amount,
        ledger: &mut dyn FungibleLedger,
    ) -> Result<ContractEvent, StakeError> {
        StakeLedger::deposit_reward(self, depositor, amount, ledger)
    }
}
