//! Trait interfaces at the edges of a distribution.
//!
//! These traits define the contracts with external collaborators:
//! - [`TokenLedger`]: the fungible-token transfer primitive
//! - [`StakingPauseOracle`]: the factory's global staking-pause switch
//!
//! A distribution never owns either: the token ledger is passed into every
//! call that moves funds, and the pause oracle is injected at creation.

use crate::error::TokenError;
use crate::types::{Address, Amount};

/// Fungible token balances for any number of tokens.
///
/// Transfers are atomic and all-or-nothing; no fees are charged, so the
/// receiver always gets exactly `amount`.
pub trait TokenLedger {
    /// Balance of `holder` in `token`.
    fn balance_of(&self, token: &Address, holder: &Address) -> Amount;

    /// Amount `spender` may still move out of `owner`'s balance.
    fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Amount;

    /// Move `amount` of `token` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InsufficientBalance`] if `from` holds less than `amount`
    /// - [`TokenError::NullAccount`] if either side is the null address
    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Move `amount` of `token` from `owner` to `to` on behalf of `spender`,
    /// consuming allowance.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InsufficientAllowance`] if the allowance is too small
    /// - any error of [`transfer`](Self::transfer)
    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Check that `transfer` would succeed, without moving anything.
    ///
    /// Default implementation compares against [`balance_of`](Self::balance_of).
    fn can_transfer(&self, token: &Address, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if from.is_zero() || to.is_zero() {
            return Err(TokenError::NullAccount);
        }
        let have = self.balance_of(token, from);
        if have < amount {
            return Err(TokenError::InsufficientBalance { token: *token, holder: *from, have, need: amount });
        }
        Ok(())
    }

    /// Check that `transfer_from` would succeed, without moving anything.
    fn can_transfer_from(
        &self,
        token: &Address,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let have = self.allowance(token, owner, spender);
        if have < amount {
            return Err(TokenError::InsufficientAllowance {
                token: *token,
                owner: *owner,
                spender: *spender,
                have,
                need: amount,
            });
        }
        self.can_transfer(token, owner, to, amount)
    }
}

/// Read-only view of the global staking-pause switch.
pub trait StakingPauseOracle: Send + Sync {
    /// Whether new stakes are currently refused.
    fn staking_paused(&self) -> bool;
}

/// Oracle for distributions that live outside a factory.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverPaused;

impl StakingPauseOracle for NeverPaused {
    fn staking_paused(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // ------------------------------------------------------------------
    // Mock: TokenLedger using only the required methods
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct FixedBalances {
        balances: HashMap<Address, Amount>,
        allowance: Amount,
    }

    impl TokenLedger for FixedBalances {
        fn balance_of(&self, _token: &Address, holder: &Address) -> Amount {
            *self.balances.get(holder).unwrap_or(&0)
        }

        fn allowance(&self, _token: &Address, _owner: &Address, _spender: &Address) -> Amount {
            self.allowance
        }

        fn transfer(&mut self, _: &Address, _: &Address, _: &Address, _: Amount) -> Result<(), TokenError> {
            unreachable!("preflight checks only")
        }

        fn transfer_from(&mut self, _: &Address, _: &Address, _: &Address, _: &Address, _: Amount) -> Result<(), TokenError> {
            unreachable!("preflight checks only")
        }
    }

    #[test]
    fn can_transfer_checks_balance() {
        let token = Address::repeat(9);
        let alice = Address::repeat(1);
        let bob = Address::repeat(2);
        let mut ledger = FixedBalances::default();
        ledger.balances.insert(alice, 10);

        assert_eq!(ledger.can_transfer(&token, &alice, &bob, 10), Ok(()));
        assert_eq!(
            ledger.can_transfer(&token, &alice, &bob, 11),
            Err(TokenError::InsufficientBalance { token, holder: alice, have: 10, need: 11 })
        );
        assert_eq!(ledger.can_transfer(&token, &alice, &Address::ZERO, 1), Err(TokenError::NullAccount));
    }

    #[test]
    fn can_transfer_from_checks_allowance_first() {
        let token = Address::repeat(9);
        let owner = Address::repeat(1);
        let spender = Address::repeat(3);
        let mut ledger = FixedBalances { allowance: 5, ..Default::default() };
        ledger.balances.insert(owner, 100);

        assert_eq!(ledger.can_transfer_from(&token, &spender, &owner, &spender, 5), Ok(()));
        assert!(matches!(
            ledger.can_transfer_from(&token, &spender, &owner, &spender, 6),
            Err(TokenError::InsufficientAllowance { have: 5, need: 6, .. })
        ));
    }

    #[test]
    fn never_paused_is_never_paused() {
        assert!(!NeverPaused.staking_paused());
    }
}
