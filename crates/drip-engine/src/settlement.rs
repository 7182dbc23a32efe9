//! Consolidate, then mutate, then transfer.
//!
//! Entry points never touch the live ledgers directly. They copy the state
//! they need into a [`Draft`], consolidate and apply their change there, and
//! hand the frozen draft plus the [`Transfer`]s it implies to
//! [`Distribution::settle`](crate::Distribution). Settling preflights every
//! transfer, executes them, and only then commits the draft. A call that
//! fails at any point leaves the distribution exactly as it was.

use drip_core::error::TokenError;
use drip_core::traits::TokenLedger;
use drip_core::types::{Address, Amount};

use crate::lifecycle::Lifecycle;
use crate::reward_ledger::RewardLedger;
use crate::staker::StakerEntity;

/// Staged state of one call: the pieces a single entry point may change.
#[derive(Clone, Debug)]
pub(crate) struct Draft {
    pub lifecycle: Lifecycle,
    pub reward: RewardLedger,
    pub account: Address,
    pub staker: StakerEntity,
    pub total_staked: Amount,
}

/// A token movement requested by an entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transfer {
    /// Pull `amount` of `token` from `from` into the distribution, using
    /// the allowance `from` granted the distribution.
    Pull { token: Address, from: Address, amount: Amount },
    /// Push `amount` of `token` from the distribution to `to`.
    Push { token: Address, to: Address, amount: Amount },
}

impl Transfer {
    fn source(&self, this: &Address) -> (Address, Address, Amount) {
        match *self {
            Self::Pull { token, from, amount } => (token, from, amount),
            Self::Push { token, amount, .. } => (token, *this, amount),
        }
    }

    fn preflight<T: TokenLedger + ?Sized>(&self, tokens: &T, this: &Address) -> Result<(), TokenError> {
        match self {
            Self::Pull { token, from, amount } => tokens.can_transfer_from(token, this, from, this, *amount),
            Self::Push { token, to, amount } => tokens.can_transfer(token, this, to, *amount),
        }
    }

    fn execute<T: TokenLedger + ?Sized>(&self, tokens: &mut T, this: &Address) -> Result<(), TokenError> {
        match self {
            Self::Pull { token, from, amount } => tokens.transfer_from(token, this, from, this, *amount),
            Self::Push { token, to, amount } => tokens.transfer(token, this, to, *amount),
        }
    }
}

/// Check that every transfer in the batch can go through, including when
/// several of them draw on the same balance.
pub(crate) fn preflight<T: TokenLedger + ?Sized>(
    tokens: &T,
    this: &Address,
    transfers: &[Transfer],
) -> Result<(), TokenError> {
    let mut drawn: Vec<(Address, Address, Amount)> = Vec::with_capacity(transfers.len());
    for transfer in transfers {
        transfer.preflight(tokens, this)?;
        let (token, holder, amount) = transfer.source(this);
        match drawn.iter_mut().find(|(t, h, _)| *t == token && *h == holder) {
            Some((_, _, total)) => {
                *total = total.checked_add(amount).ok_or(TokenError::BalanceOverflow { token })?
            }
            None => drawn.push((token, holder, amount)),
        }
    }
    for (token, holder, need) in drawn {
        let have = tokens.balance_of(&token, &holder);
        if have < need {
            return Err(TokenError::InsufficientBalance { token, holder, have, need });
        }
    }
    Ok(())
}

/// Preflight, then execute the batch in order.
pub(crate) fn execute<T: TokenLedger + ?Sized>(
    tokens: &mut T,
    this: &Address,
    transfers: &[Transfer],
) -> Result<(), TokenError> {
    preflight(&*tokens, this, transfers)?;
    for transfer in transfers {
        transfer.execute(tokens, this)?;
    }
    Ok(())
}
