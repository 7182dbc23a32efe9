//! Global state of a distribution's reward pool.
//!
//! # Invariants
//!
//! * `total_claimed + total_recovered + orphaned / M <= total_committed`
//! * `per_unit_accumulator` never decreases
//! * `remaining` never increases except through [`RewardLedger::commit`],
//!   and reaches exactly zero once a consolidation lands on the end timestamp

use serde::{Deserialize, Serialize};

use drip_core::error::MathError;
use drip_core::fixed::Scaled;
use drip_core::types::{Address, Amount, Timestamp};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewardLedger {
    pub(crate) token: Address,
    /// Reward ever committed: the initial amount plus every top-up.
    pub(crate) total_committed: Amount,
    /// Scaled reward still to stream over the rest of the window.
    pub(crate) remaining: Scaled,
    /// Scaled cumulative reward per staked unit since start.
    pub(crate) per_unit_accumulator: Scaled,
    /// Scaled reward that accrued while nobody was staked.
    pub(crate) orphaned: Scaled,
    /// Reward paid out to stakers.
    pub(crate) total_claimed: Amount,
    /// Orphaned reward handed back to the owner.
    pub(crate) total_recovered: Amount,
    /// Instant up to which the stream has been consolidated.
    pub(crate) last_consolidation: Timestamp,
}

impl RewardLedger {
    /// Empty ledger for `token`, consolidated up to `starting_timestamp`.
    pub fn new(token: Address, starting_timestamp: Timestamp) -> Self {
        Self {
            token,
            last_consolidation: starting_timestamp,
            ..Self::default()
        }
    }

    /// Add `amount` to the pool; it streams over whatever window is left.
    pub fn commit(&mut self, amount: Amount) -> Result<(), MathError> {
        let total = self.total_committed.checked_add(amount).ok_or(MathError::Overflow)?;
        let remaining = self.remaining.checked_add(Scaled::from_amount(amount)?)?;
        self.total_committed = total;
        self.remaining = remaining;
        Ok(())
    }

    /// Record `amount` as paid out to a staker.
    ///
    /// The per-staker bound is enforced by the staker ledger, not here.
    pub fn mark_claimed(&mut self, amount: Amount) -> Result<(), MathError> {
        self.total_claimed = self.total_claimed.checked_add(amount).ok_or(MathError::Overflow)?;
        Ok(())
    }

    /// Reset the orphaned reward to zero and return its unscaled value.
    ///
    /// The sub-unit remainder is dropped and stays in the pool.
    pub fn drain_orphaned(&mut self) -> Result<Amount, MathError> {
        let amount = self.orphaned.to_amount()?;
        self.orphaned = Scaled::ZERO;
        Ok(amount)
    }

    /// Record orphaned reward handed back to the owner.
    pub fn record_recovered(&mut self, amount: Amount) -> Result<(), MathError> {
        self.total_recovered = self.total_recovered.checked_add(amount).ok_or(MathError::Overflow)?;
        Ok(())
    }

    /// Reward the pool still owes: everything committed that was neither
    /// claimed by stakers nor recovered by the owner.
    pub fn outstanding(&self) -> Result<Amount, MathError> {
        self.total_committed
            .checked_sub(self.total_claimed)
            .and_then(|v| v.checked_sub(self.total_recovered))
            .ok_or(MathError::Underflow)
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn total_committed(&self) -> Amount {
        self.total_committed
    }

    pub fn remaining(&self) -> Scaled {
        self.remaining
    }

    pub fn per_unit_accumulator(&self) -> Scaled {
        self.per_unit_accumulator
    }

    pub fn orphaned(&self) -> Scaled {
        self.orphaned
    }

    pub fn total_claimed(&self) -> Amount {
        self.total_claimed
    }

    pub fn total_recovered(&self) -> Amount {
        self.total_recovered
    }

    pub fn last_consolidation(&self) -> Timestamp {
        self.last_consolidation
    }

    /// Unscaled, serializable view for reports.
    pub fn snapshot(&self) -> Result<RewardSnapshot, MathError> {
        Ok(RewardSnapshot {
            token: self.token,
            total_committed: self.total_committed,
            remaining: self.remaining.to_amount()?,
            per_unit_accumulator: self.per_unit_accumulator.to_string(),
            orphaned: self.orphaned.to_amount()?,
            total_claimed: self.total_claimed,
            total_recovered: self.total_recovered,
            last_consolidation: self.last_consolidation,
        })
    }
}

/// Point-in-time view of a [`RewardLedger`], scaled values truncated to units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSnapshot {
    pub token: Address,
    pub total_committed: Amount,
    pub remaining: Amount,
    /// Raw scaled accumulator, as a decimal string.
    pub per_unit_accumulator: String,
    pub orphaned: Amount,
    pub total_claimed: Amount,
    pub total_recovered: Amount,
    pub last_consolidation: Timestamp,
}
