//! In-memory token ledger.
//!
//! [`MemoryTokenLedger`] implements [`TokenLedger`] over `HashMap`s with no
//! persistence. It backs the scenario runner and the test suites; a real
//! deployment plugs in its own token primitive.

use std::collections::HashMap;

use crate::error::TokenError;
use crate::traits::TokenLedger;
use crate::types::{Address, Amount};

#[derive(Clone, Debug, Default)]
pub struct MemoryTokenLedger {
    /// (token, holder) → balance.
    balances: HashMap<(Address, Address), Amount>,
    /// (token, owner, spender) → remaining allowance.
    allowances: HashMap<(Address, Address, Address), Amount>,
    /// token → total minted.
    supplies: HashMap<Address, Amount>,
}

impl MemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new units of `token` for `to`.
    pub fn mint(&mut self, token: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::NullAccount);
        }
        let supply = self.supplies.entry(*token).or_default();
        *supply = supply
            .checked_add(amount)
            .ok_or(TokenError::BalanceOverflow { token: *token })?;
        let balance = self.balances.entry((*token, *to)).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(TokenError::BalanceOverflow { token: *token })?;
        Ok(())
    }

    /// Set the allowance of `spender` over `owner`'s `token` balance.
    pub fn approve(&mut self, token: &Address, owner: &Address, spender: &Address, amount: Amount) {
        self.allowances.insert((*token, *owner, *spender), amount);
    }

    /// Total minted supply of `token`.
    pub fn total_supply(&self, token: &Address) -> Amount {
        *self.supplies.get(token).unwrap_or(&0)
    }

    /// All non-zero balances, sorted by token then holder.
    pub fn balances(&self) -> Vec<(Address, Address, Amount)> {
        let mut out: Vec<_> = self
            .balances
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|((token, holder), amount)| (*token, *holder, *amount))
            .collect();
        out.sort();
        out
    }
}

impl TokenLedger for MemoryTokenLedger {
    fn balance_of(&self, token: &Address, holder: &Address) -> Amount {
        *self.balances.get(&(*token, *holder)).unwrap_or(&0)
    }

    fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Amount {
        *self.allowances.get(&(*token, *owner, *spender)).unwrap_or(&0)
    }

    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.can_transfer(token, from, to, amount)?;
        if from == to || amount == 0 {
            return Ok(());
        }
        let to_balance = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(TokenError::BalanceOverflow { token: *token })?;
        let from_balance = self.balance_of(token, from) - amount;
        self.balances.insert((*token, *from), from_balance);
        self.balances.insert((*token, *to), to_balance);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        self.can_transfer_from(token, spender, owner, to, amount)?;
        let remaining = self.allowance(token, owner, spender) - amount;
        self.transfer(token, owner, to, amount)?;
        self.allowances.insert((*token, *owner, *spender), remaining);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: Address = Address([9; 20]);
    const ALICE: Address = Address([1; 20]);
    const BOB: Address = Address([2; 20]);
    const POOL: Address = Address([3; 20]);

    #[test]
    fn mint_updates_balance_and_supply() {
        let mut ledger = MemoryTokenLedger::new();
        ledger.mint(&TOKEN, &ALICE, 100).unwrap();
        ledger.mint(&TOKEN, &BOB, 50).unwrap();
        assert_eq!(ledger.balance_of(&TOKEN, &ALICE), 100);
        assert_eq!(ledger.total_supply(&TOKEN), 150);
    }

    #[test]
    fn mint_to_null_rejected() {
        let mut ledger = MemoryTokenLedger::new();
        assert_eq!(ledger.mint(&TOKEN, &Address::ZERO, 1), Err(TokenError::NullAccount));
    }

    #[test]
    fn transfer_moves_exact_amount() {
        let mut ledger = MemoryTokenLedger::new();
        ledger.mint(&TOKEN, &ALICE, 100).unwrap();
        ledger.transfer(&TOKEN, &ALICE, &BOB, 40).unwrap();
        assert_eq!(ledger.balance_of(&TOKEN, &ALICE), 60);
        assert_eq!(ledger.balance_of(&TOKEN, &BOB), 40);
        assert_eq!(ledger.total_supply(&TOKEN), 100);
    }

    #[test]
    fn failed_transfer_changes_nothing() {
        let mut ledger = MemoryTokenLedger::new();
        ledger.mint(&TOKEN, &ALICE, 10).unwrap();
        let err = ledger.transfer(&TOKEN, &ALICE, &BOB, 11).unwrap_err();
        assert_eq!(err, TokenError::InsufficientBalance { token: TOKEN, holder: ALICE, have: 10, need: 11 });
        assert_eq!(ledger.balance_of(&TOKEN, &ALICE), 10);
        assert_eq!(ledger.balance_of(&TOKEN, &BOB), 0);
    }

    #[test]
    fn self_transfer_is_noop() {
        let mut ledger = MemoryTokenLedger::new();
        ledger.mint(&TOKEN, &ALICE, 10).unwrap();
        ledger.transfer(&TOKEN, &ALICE, &ALICE, 10).unwrap();
        assert_eq!(ledger.balance_of(&TOKEN, &ALICE), 10);
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let mut ledger = MemoryTokenLedger::new();
        ledger.mint(&TOKEN, &ALICE, 100).unwrap();
        ledger.approve(&TOKEN, &ALICE, &POOL, 30);
        ledger.transfer_from(&TOKEN, &POOL, &ALICE, &POOL, 20).unwrap();
        assert_eq!(ledger.allowance(&TOKEN, &ALICE, &POOL), 10);
        assert_eq!(ledger.balance_of(&TOKEN, &POOL), 20);

        let err = ledger.transfer_from(&TOKEN, &POOL, &ALICE, &POOL, 11).unwrap_err();
        assert!(matches!(err, TokenError::InsufficientAllowance { have: 10, need: 11, .. }));
        assert_eq!(ledger.balance_of(&TOKEN, &ALICE), 80);
    }

    #[test]
    fn balances_lists_non_zero_sorted() {
        let mut ledger = MemoryTokenLedger::new();
        ledger.mint(&TOKEN, &BOB, 5).unwrap();
        ledger.mint(&TOKEN, &ALICE, 7).unwrap();
        ledger.transfer(&TOKEN, &BOB, &ALICE, 5).unwrap();
        assert_eq!(ledger.balances(), vec![(TOKEN, ALICE, 12)]);
    }
}
