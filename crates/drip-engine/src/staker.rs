//! Per-account staking state.
//!
//! Entries are created lazily the first time an account is consolidated and
//! are never removed; a fully withdrawn account keeps its earned/claimed
//! history and can stake again.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use drip_core::error::{MathError, ValueError};
use drip_core::fixed::Scaled;
use drip_core::types::{Address, Amount};

/// One staker's position.
///
/// # Invariants
///
/// * `claimed <= earned`
/// * `earned` never decreases
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StakerEntity {
    pub(crate) stake: Amount,
    /// The global accumulator as of this staker's last consolidation.
    pub(crate) consolidated_accumulator: Scaled,
    pub(crate) earned: Amount,
    pub(crate) claimed: Amount,
}

impl StakerEntity {
    pub fn stake(&self) -> Amount {
        self.stake
    }

    pub fn consolidated_accumulator(&self) -> Scaled {
        self.consolidated_accumulator
    }

    pub fn earned(&self) -> Amount {
        self.earned
    }

    pub fn claimed(&self) -> Amount {
        self.claimed
    }

    /// Reward attributed but not yet paid out.
    pub fn claimable(&self) -> Amount {
        debug_assert!(self.claimed <= self.earned);
        self.earned.saturating_sub(self.claimed)
    }

    pub(crate) fn credit_stake(&mut self, amount: Amount) -> Result<(), MathError> {
        self.stake = self.stake.checked_add(amount).ok_or(MathError::Overflow)?;
        Ok(())
    }

    pub(crate) fn debit_stake(&mut self, amount: Amount) -> Result<(), ValueError> {
        self.stake = self.stake.checked_sub(amount).ok_or(ValueError::WithdrawExceedsStake {
            staked: self.stake,
            requested: amount,
        })?;
        Ok(())
    }

    pub(crate) fn record_claim(&mut self, amount: Amount) -> Result<(), ValueError> {
        let claimable = self.claimable();
        if amount > claimable {
            return Err(ValueError::ClaimExceedsClaimable { claimable, requested: amount });
        }
        self.claimed += amount;
        Ok(())
    }
}

/// Serializable view of one staker, for reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakerSnapshot {
    pub account: Address,
    pub stake: Amount,
    pub earned: Amount,
    pub claimed: Amount,
}

/// Every staker of a distribution plus the running stake total.
///
/// # Invariants
///
/// * `total_staked == entries.values().map(|e| e.stake).sum()`
#[derive(Clone, Debug, Default)]
pub struct StakerLedger {
    entries: BTreeMap<Address, StakerEntity>,
    total_staked: Amount,
}

impl StakerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account: &Address) -> Option<&StakerEntity> {
        self.entries.get(account)
    }

    /// The entry for `account`, or a fresh one if it never staked.
    pub fn entry_or_default(&self, account: &Address) -> StakerEntity {
        self.entries.get(account).cloned().unwrap_or_default()
    }

    pub fn total_staked(&self) -> Amount {
        self.total_staked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &StakerEntity)> {
        self.entries.iter()
    }

    pub fn snapshots(&self) -> Vec<StakerSnapshot> {
        self.entries
            .iter()
            .map(|(account, e)| StakerSnapshot {
                account: *account,
                stake: e.stake,
                earned: e.earned,
                claimed: e.claimed,
            })
            .collect()
    }

    /// Store a consolidated entry together with the new stake total.
    ///
    /// Accounts that never held a stake are not materialized.
    pub(crate) fn put(&mut self, account: Address, entry: StakerEntity, total_staked: Amount) {
        let untouched = entry.stake == 0 && entry.earned == 0 && entry.claimed == 0;
        if !(untouched && !self.entries.contains_key(&account)) {
            self.entries.insert(account, entry);
        }
        self.total_staked = total_staked;
    }
}
