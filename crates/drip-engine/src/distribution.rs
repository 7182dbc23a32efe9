//! The distribution: guarded entry points over the reward and staker ledgers.
//!
//! Every mutating entry point follows the same order:
//! 1. lifecycle and ownership guards,
//! 2. consolidation of the caller into a [`Draft`],
//! 3. the entry point's own change to the draft,
//! 4. [`Distribution::settle`]: token transfers, then commit, then events.
//!
//! Reads go through [`accrual::project`] and never mutate.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use drip_core::error::{ConfigError, DistributionError, MathError, StateError, TimingError, ValueError};
use drip_core::event::DistributionEvent;
use drip_core::traits::{NeverPaused, StakingPauseOracle, TokenLedger};
use drip_core::types::{Address, Amount, CallContext, DistributionConfig, Timestamp};

use crate::accrual;
use crate::lifecycle::{Lifecycle, Phase};
use crate::ownership::Ownership;
use crate::reward_ledger::{RewardLedger, RewardSnapshot};
use crate::settlement::{self, Draft, Transfer};
use crate::staker::{StakerEntity, StakerLedger};

/// One staking reward distribution.
///
/// Every committed call appends its events to an in-memory journal. The
/// journal is unbounded: it grows until the owner of the value takes the
/// events with [`Distribution::drain_events`], which a long-lived host must
/// do after each call or batch.
pub struct Distribution {
    /// Account holding the distribution's reward and staked tokens.
    address: Address,
    ownership: Ownership,
    lifecycle: Lifecycle,
    config: Option<DistributionConfig>,
    reward: RewardLedger,
    stakers: StakerLedger,
    pause: Arc<dyn StakingPauseOracle>,
    events: Vec<DistributionEvent>,
}

impl fmt::Debug for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Distribution")
            .field("address", &self.address)
            .field("ownership", &self.ownership)
            .field("lifecycle", &self.lifecycle)
            .field("config", &self.config)
            .field("reward", &self.reward)
            .field("stakers", &self.stakers.len())
            .finish_non_exhaustive()
    }
}

impl Distribution {
    /// Create an uninitialized distribution owned by `owner` (normally the
    /// deployer, which initializes it and then hands ownership over).
    pub fn new(
        address: Address,
        owner: Address,
        pause: Arc<dyn StakingPauseOracle>,
    ) -> Result<Self, DistributionError> {
        Ok(Self {
            address,
            ownership: Ownership::new(owner)?,
            lifecycle: Lifecycle::new(),
            config: None,
            reward: RewardLedger::default(),
            stakers: StakerLedger::new(),
            pause,
            events: Vec::new(),
        })
    }

    /// A distribution outside any factory: staking is never paused.
    pub fn standalone(address: Address, owner: Address) -> Result<Self, DistributionError> {
        Self::new(address, owner, Arc::new(NeverPaused))
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Fix the configuration and commit the initial reward.
    ///
    /// The reward must already sit in the distribution's balance.
    pub fn initialize<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &T,
        ctx: CallContext,
        config: DistributionConfig,
    ) -> Result<(), DistributionError> {
        self.ownership.require_owner(&ctx.caller)?;
        self.lifecycle.require_uninitialized()?;
        config.validate(ctx.now)?;

        let have = tokens.balance_of(&config.reward_token, &self.address);
        if have < config.reward_amount {
            return Err(ConfigError::InsufficientFunding { have, need: config.reward_amount }.into());
        }
        if config.reward_token == config.stakable_token {
            warn!(
                distribution = %self.address,
                token = %config.reward_token,
                "reward and stakable token are the same asset; unassigned-reward recovery reconciles against the live balance, which includes stakes"
            );
        }

        let mut reward = RewardLedger::new(config.reward_token, config.starting_timestamp);
        reward.commit(config.reward_amount)?;

        self.reward = reward;
        self.lifecycle
            .mark_initialized(config.starting_timestamp, config.ending_timestamp);
        self.events.push(DistributionEvent::Initialized {
            reward_token: config.reward_token,
            stakable_token: config.stakable_token,
            reward_amount: config.reward_amount,
            starting_timestamp: config.starting_timestamp,
            ending_timestamp: config.ending_timestamp,
            locked: config.locked,
            staking_cap: config.staking_cap,
        });
        info!(
            distribution = %self.address,
            reward_amount = config.reward_amount,
            start = config.starting_timestamp,
            end = config.ending_timestamp,
            locked = config.locked,
            "distribution initialized"
        );
        self.config = Some(config);
        Ok(())
    }

    /// Cancel before start and refund the whole reward balance to the owner.
    pub fn cancel<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        ctx: CallContext,
    ) -> Result<Amount, DistributionError> {
        self.ownership.require_owner(&ctx.caller)?;
        self.lifecycle.require_cancelable(ctx.now)?;

        let token = self.reward.token();
        let refunded = tokens.balance_of(&token, &self.address);
        let mut draft = self.draft(ctx.caller);
        draft.lifecycle.mark_canceled();

        self.settle(
            tokens,
            draft,
            &push(token, ctx.caller, refunded),
            vec![DistributionEvent::Canceled { refunded }],
        )?;
        info!(distribution = %self.address, refunded, "distribution canceled");
        Ok(refunded)
    }

    /// Sweep reward tokens that reached a canceled distribution.
    pub fn recover_reward_after_cancel<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        ctx: CallContext,
    ) -> Result<Amount, DistributionError> {
        self.ownership.require_owner(&ctx.caller)?;
        self.lifecycle.require_canceled()?;

        let token = self.reward.token();
        let amount = tokens.balance_of(&token, &self.address);
        if amount == 0 {
            return Ok(0);
        }
        let draft = self.draft(ctx.caller);
        self.settle(
            tokens,
            draft,
            &push(token, ctx.caller, amount),
            vec![DistributionEvent::Recovered { token, recipient: ctx.caller, amount }],
        )?;
        info!(distribution = %self.address, amount, "reward recovered after cancel");
        Ok(amount)
    }

    /// Send the owner the reward nobody can claim: orphaned reward plus any
    /// reward-token balance beyond what the pool still owes.
    ///
    /// The excess is reconciled against the live token balance. When the
    /// reward and stakable token are the same asset that balance includes
    /// stakes; see the warning logged at initialization.
    pub fn recover_unassigned_reward<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        ctx: CallContext,
    ) -> Result<Amount, DistributionError> {
        self.ownership.require_owner(&ctx.caller)?;
        self.lifecycle.require_started(ctx.now)?;

        let mut draft = self.draft(ctx.caller);
        self.consolidate_draft(&mut draft, ctx.now)?;
        let drained = draft.reward.drain_orphaned()?;
        draft.reward.record_recovered(drained)?;

        let token = draft.reward.token();
        let outstanding = draft.reward.outstanding()?;
        let balance = tokens.balance_of(&token, &self.address);
        let recoverable = balance.checked_sub(outstanding).ok_or(MathError::Underflow)?;

        let events = if recoverable > 0 {
            vec![DistributionEvent::Recovered { token, recipient: ctx.caller, amount: recoverable }]
        } else {
            Vec::new()
        };
        self.settle(tokens, draft, &push(token, ctx.caller, recoverable), events)?;
        info!(distribution = %self.address, drained, recoverable, "unassigned reward recovered");
        Ok(recoverable)
    }

    /// Top up the pool; the amount streams over the rest of the window.
    pub fn add_reward<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        ctx: CallContext,
        amount: Amount,
    ) -> Result<(), DistributionError> {
        self.lifecycle.require_started(ctx.now)?;
        self.lifecycle.require_before_end(ctx.now)?;
        if amount == 0 {
            return Err(ValueError::ZeroAmount.into());
        }

        let mut draft = self.draft(ctx.caller);
        self.consolidate_draft(&mut draft, ctx.now)?;
        draft.reward.commit(amount)?;

        let token = draft.reward.token();
        let total = draft.reward.total_committed();
        self.settle(
            tokens,
            draft,
            &[Transfer::Pull { token, from: ctx.caller, amount }],
            vec![DistributionEvent::RewardUpdated { token, added: amount, total }],
        )?;
        info!(distribution = %self.address, from = %ctx.caller, amount, total, "reward added");
        Ok(())
    }

    pub fn transfer_ownership(&mut self, ctx: CallContext, new_owner: Address) -> Result<(), DistributionError> {
        let previous = self.ownership.transfer(&ctx.caller, new_owner)?;
        self.events.push(DistributionEvent::OwnershipTransferred {
            previous: Some(previous),
            new: Some(new_owner),
        });
        info!(distribution = %self.address, %previous, new = %new_owner, "ownership transferred");
        Ok(())
    }

    /// Give up ownership permanently. No owner-only call is possible after this.
    pub fn renounce_ownership(&mut self, ctx: CallContext) -> Result<(), DistributionError> {
        let previous = self.ownership.renounce(&ctx.caller)?;
        self.events.push(DistributionEvent::OwnershipTransferred { previous: Some(previous), new: None });
        info!(distribution = %self.address, %previous, "ownership renounced");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Staking
    // ------------------------------------------------------------------

    pub fn stake<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        ctx: CallContext,
        amount: Amount,
    ) -> Result<(), DistributionError> {
        self.lifecycle.require_running(ctx.now)?;
        if self.pause.staking_paused() {
            return Err(StateError::StakingPaused.into());
        }
        if amount == 0 {
            return Err(ValueError::ZeroAmount.into());
        }
        let config = self.configured()?;
        let (stakable, has_cap, cap) = (config.stakable_token, config.has_staking_cap(), config.staking_cap);

        let staked = self.stakers.total_staked();
        let total = staked.checked_add(amount).ok_or(MathError::Overflow)?;
        if has_cap && total > cap {
            return Err(ValueError::StakingCapExceeded { cap, staked, requested: amount }.into());
        }

        let mut draft = self.draft(ctx.caller);
        self.consolidate_draft(&mut draft, ctx.now)?;
        draft.staker.credit_stake(amount)?;
        draft.total_staked = total;

        self.settle(
            tokens,
            draft,
            &[Transfer::Pull { token: stakable, from: ctx.caller, amount }],
            vec![DistributionEvent::Staked { staker: ctx.caller, amount }],
        )?;
        debug!(distribution = %self.address, staker = %ctx.caller, amount, total, "staked");
        Ok(())
    }

    pub fn withdraw<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        ctx: CallContext,
        amount: Amount,
    ) -> Result<(), DistributionError> {
        self.lifecycle.require_started(ctx.now)?;
        let config = self.configured()?;
        let (stakable, locked) = (config.stakable_token, config.locked);
        self.lifecycle.require_unlocked(locked, ctx.now)?;
        if amount == 0 {
            return Err(ValueError::ZeroAmount.into());
        }

        let mut draft = self.draft(ctx.caller);
        self.consolidate_draft(&mut draft, ctx.now)?;
        draft.staker.debit_stake(amount)?;
        draft.total_staked = draft.total_staked.checked_sub(amount).ok_or(MathError::Underflow)?;

        self.settle(
            tokens,
            draft,
            &[Transfer::Push { token: stakable, to: ctx.caller, amount }],
            vec![DistributionEvent::Withdrawn { withdrawer: ctx.caller, amount }],
        )?;
        debug!(distribution = %self.address, staker = %ctx.caller, amount, "withdrawn");
        Ok(())
    }

    /// Pay `amount` of the caller's claimable reward to `recipient`.
    pub fn claim<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        ctx: CallContext,
        amount: Amount,
        recipient: Address,
    ) -> Result<(), DistributionError> {
        self.claim_inner(tokens, ctx, Some(amount), recipient).map(|_| ())
    }

    /// Pay the caller's whole claimable reward to `recipient`.
    pub fn claim_all<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        ctx: CallContext,
        recipient: Address,
    ) -> Result<Amount, DistributionError> {
        self.claim_inner(tokens, ctx, None, recipient)
    }

    fn claim_inner<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        ctx: CallContext,
        amount: Option<Amount>,
        recipient: Address,
    ) -> Result<Amount, DistributionError> {
        self.lifecycle.require_started(ctx.now)?;
        if recipient.is_zero() {
            return Err(ValueError::NullRecipient.into());
        }

        let mut draft = self.draft(ctx.caller);
        self.consolidate_draft(&mut draft, ctx.now)?;
        let amount = amount.unwrap_or_else(|| draft.staker.claimable());
        let (transfers, events) = stage_claim(&mut draft, ctx.caller, amount, recipient)?;

        self.settle(tokens, draft, &transfers, events)?;
        debug!(distribution = %self.address, claimer = %ctx.caller, %recipient, amount, "claimed");
        Ok(amount)
    }

    /// Claim everything to `recipient` and withdraw the caller's whole stake.
    ///
    /// Returns `(claimed, withdrawn)`.
    pub fn exit<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        ctx: CallContext,
        recipient: Address,
    ) -> Result<(Amount, Amount), DistributionError> {
        self.lifecycle.require_started(ctx.now)?;
        if recipient.is_zero() {
            return Err(ValueError::NullRecipient.into());
        }
        let config = self.configured()?;
        let (stakable, locked) = (config.stakable_token, config.locked);
        self.lifecycle.require_unlocked(locked, ctx.now)?;

        let mut draft = self.draft(ctx.caller);
        self.consolidate_draft(&mut draft, ctx.now)?;

        let claimed = draft.staker.claimable();
        let (mut transfers, mut events) = stage_claim(&mut draft, ctx.caller, claimed, recipient)?;

        let withdrawn = draft.staker.stake();
        if withdrawn == 0 {
            return Err(ValueError::ZeroAmount.into());
        }
        draft.staker.debit_stake(withdrawn)?;
        draft.total_staked = draft.total_staked.checked_sub(withdrawn).ok_or(MathError::Underflow)?;
        transfers.push(Transfer::Push { token: stakable, to: ctx.caller, amount: withdrawn });
        events.push(DistributionEvent::Withdrawn { withdrawer: ctx.caller, amount: withdrawn });

        self.settle(tokens, draft, &transfers, events)?;
        debug!(distribution = %self.address, staker = %ctx.caller, claimed, withdrawn, "exited");
        Ok((claimed, withdrawn))
    }

    /// Consolidate the caller without any other change.
    pub fn consolidate_reward(&mut self, ctx: CallContext) -> Result<(), DistributionError> {
        self.lifecycle.require_started(ctx.now)?;
        let mut draft = self.draft(ctx.caller);
        self.consolidate_draft(&mut draft, ctx.now)?;
        self.commit(draft);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn configured(&self) -> Result<&DistributionConfig, TimingError> {
        self.config.as_ref().ok_or(TimingError::NotInitialized)
    }

    fn window_end(&self) -> Timestamp {
        self.config.as_ref().map_or(0, |c| c.ending_timestamp)
    }

    fn draft(&self, account: Address) -> Draft {
        Draft {
            lifecycle: self.lifecycle,
            reward: self.reward.clone(),
            account,
            staker: self.stakers.entry_or_default(&account),
            total_staked: self.stakers.total_staked(),
        }
    }

    fn consolidate_draft(&self, draft: &mut Draft, now: Timestamp) -> Result<(), DistributionError> {
        let end = self.window_end();
        accrual::consolidate(&mut draft.reward, &mut draft.staker, now, end, draft.total_staked)?;
        Ok(())
    }

    /// Execute the draft's transfers, then commit it and record its events.
    ///
    /// The draft is frozen by the time it gets here; a failed transfer
    /// drops it and nothing is committed.
    fn settle<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        draft: Draft,
        transfers: &[Transfer],
        events: Vec<DistributionEvent>,
    ) -> Result<(), DistributionError> {
        settlement::execute(tokens, &self.address, transfers)?;
        self.commit(draft);
        self.events.extend(events);
        Ok(())
    }

    fn commit(&mut self, draft: Draft) {
        self.lifecycle = draft.lifecycle;
        self.reward = draft.reward;
        self.stakers.put(draft.account, draft.staker, draft.total_staked);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn owner(&self) -> Option<Address> {
        self.ownership.owner()
    }

    pub fn config(&self) -> Option<&DistributionConfig> {
        self.config.as_ref()
    }

    pub fn phase(&self, now: Timestamp) -> Phase {
        self.lifecycle.phase(now)
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle.is_initialized()
    }

    pub fn is_canceled(&self) -> bool {
        self.lifecycle.is_canceled()
    }

    pub fn reward_token(&self) -> Option<Address> {
        self.config.as_ref().map(|c| c.reward_token)
    }

    pub fn stakable_token(&self) -> Option<Address> {
        self.config.as_ref().map(|c| c.stakable_token)
    }

    pub fn starting_timestamp(&self) -> Option<Timestamp> {
        self.config.as_ref().map(|c| c.starting_timestamp)
    }

    pub fn ending_timestamp(&self) -> Option<Timestamp> {
        self.config.as_ref().map(|c| c.ending_timestamp)
    }

    pub fn seconds_duration(&self) -> Option<u64> {
        self.config.as_ref().map(DistributionConfig::seconds_duration)
    }

    pub fn locked(&self) -> bool {
        self.config.as_ref().is_some_and(|c| c.locked)
    }

    /// Zero means uncapped.
    pub fn staking_cap(&self) -> Amount {
        self.config.as_ref().map_or(0, |c| c.staking_cap)
    }

    /// Total reward ever committed, top-ups included.
    pub fn reward_amount(&self) -> Amount {
        self.reward.total_committed()
    }

    pub fn total_staked_tokens(&self) -> Amount {
        self.stakers.total_staked()
    }

    pub fn staked_tokens_of(&self, account: &Address) -> Amount {
        self.stakers.get(account).map_or(0, StakerEntity::stake)
    }

    pub fn claimed_reward_of(&self, account: &Address) -> Amount {
        self.stakers.get(account).map_or(0, StakerEntity::claimed)
    }

    /// What `account` could claim at `now`.
    pub fn claimable_reward(&self, account: &Address, now: Timestamp) -> Result<Amount, DistributionError> {
        Ok(self.project_staker(account, now)?.claimable())
    }

    /// Everything attributed to `account` as of `now`, claimed or not.
    pub fn earned_reward_of(&self, account: &Address, now: Timestamp) -> Result<Amount, DistributionError> {
        Ok(self.project_staker(account, now)?.earned())
    }

    fn project_staker(&self, account: &Address, now: Timestamp) -> Result<StakerEntity, DistributionError> {
        let staker = self.stakers.entry_or_default(account);
        if !self.lifecycle.is_initialized() || self.lifecycle.is_canceled() {
            return Ok(staker);
        }
        let (_, staker) = accrual::project(
            &self.reward,
            &staker,
            now,
            self.window_end(),
            self.stakers.total_staked(),
        )?;
        Ok(staker)
    }

    /// What [`recover_unassigned_reward`](Self::recover_unassigned_reward)
    /// would send the owner at `now`.
    pub fn recoverable_unassigned_reward<T: TokenLedger + ?Sized>(
        &self,
        tokens: &T,
        now: Timestamp,
    ) -> Result<Amount, DistributionError> {
        if !self.lifecycle.is_initialized() || self.lifecycle.is_canceled() {
            return Ok(0);
        }
        let (ledger, _) = accrual::project(
            &self.reward,
            &StakerEntity::default(),
            now,
            self.window_end(),
            self.stakers.total_staked(),
        )?;
        let orphaned = ledger.orphaned().to_amount()?;
        let outstanding = ledger
            .outstanding()?
            .checked_sub(orphaned)
            .ok_or(MathError::Underflow)?;
        let balance = tokens.balance_of(&ledger.token(), &self.address);
        Ok(balance.checked_sub(outstanding).ok_or(MathError::Underflow)?)
    }

    /// Orphaned reward consolidated so far, in units.
    pub fn orphaned_reward(&self) -> Result<Amount, DistributionError> {
        Ok(self.reward.orphaned().to_amount()?)
    }

    pub fn reward_snapshot(&self) -> Result<RewardSnapshot, DistributionError> {
        Ok(self.reward.snapshot()?)
    }

    pub fn reward_ledger(&self) -> &RewardLedger {
        &self.reward
    }

    pub fn stakers(&self) -> &StakerLedger {
        &self.stakers
    }

    /// Events recorded so far, oldest first.
    pub fn events(&self) -> &[DistributionEvent] {
        &self.events
    }

    /// Hand recorded events to an observer, clearing the journal.
    pub fn drain_events(&mut self) -> Vec<DistributionEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Single push of `amount`, or nothing when there is nothing to move.
fn push(token: Address, to: Address, amount: Amount) -> Vec<Transfer> {
    if amount == 0 {
        return Vec::new();
    }
    vec![Transfer::Push { token, to, amount }]
}

/// Apply a claim of `amount` to the draft and return the payout it implies.
fn stage_claim(
    draft: &mut Draft,
    claimer: Address,
    amount: Amount,
    recipient: Address,
) -> Result<(Vec<Transfer>, Vec<DistributionEvent>), DistributionError> {
    draft.staker.record_claim(amount)?;
    if amount == 0 {
        return Ok((Vec::new(), Vec::new()));
    }
    draft.reward.mark_claimed(amount)?;
    let token = draft.reward.token();
    Ok((
        vec![Transfer::Push { token, to: recipient, amount }],
        vec![DistributionEvent::Claimed { claimer, recipient, amount }],
    ))
}
