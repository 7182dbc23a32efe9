//! Single-owner access control.
//!
//! Renouncing is permanent. It is an explicit [`Ownership::Renounced`]
//! state rather than a null owner, so no code path can mistake it for an
//! address that might one day sign a call.

use serde::{Deserialize, Serialize};

use drip_core::error::AuthError;
use drip_core::types::Address;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "owner", rename_all = "snake_case")]
pub enum Ownership {
    Owned(Address),
    Renounced,
}

impl Ownership {
    pub fn new(owner: Address) -> Result<Self, AuthError> {
        if owner.is_zero() {
            return Err(AuthError::NullOwner);
        }
        Ok(Self::Owned(owner))
    }

    pub fn owner(&self) -> Option<Address> {
        match self {
            Self::Owned(owner) => Some(*owner),
            Self::Renounced => None,
        }
    }

    pub fn require_owner(&self, caller: &Address) -> Result<(), AuthError> {
        match self {
            Self::Owned(owner) if owner == caller => Ok(()),
            Self::Owned(_) => Err(AuthError::NotOwner { caller: *caller }),
            Self::Renounced => Err(AuthError::Renounced),
        }
    }

    /// Hand ownership to `new_owner`. Returns the previous owner.
    pub fn transfer(&mut self, caller: &Address, new_owner: Address) -> Result<Address, AuthError> {
        self.require_owner(caller)?;
        if new_owner.is_zero() {
            return Err(AuthError::NullOwner);
        }
        *self = Self::Owned(new_owner);
        Ok(*caller)
    }

    /// Give up ownership for good. Returns the previous owner.
    pub fn renounce(&mut self, caller: &Address) -> Result<Address, AuthError> {
        self.require_owner(caller)?;
        *self = Self::Renounced;
        Ok(*caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address([1; 20]);
    const BOB: Address = Address([2; 20]);

    #[test]
    fn null_owner_rejected() {
        assert_eq!(Ownership::new(Address::ZERO), Err(AuthError::NullOwner));
    }

    #[test]
    fn only_owner_passes() {
        let o = Ownership::new(ALICE).unwrap();
        assert_eq!(o.require_owner(&ALICE), Ok(()));
        assert_eq!(o.require_owner(&BOB), Err(AuthError::NotOwner { caller: BOB }));
    }

    #[test]
    fn transfer_moves_ownership() {
        let mut o = Ownership::new(ALICE).unwrap();
        assert_eq!(o.transfer(&ALICE, BOB), Ok(ALICE));
        assert_eq!(o.owner(), Some(BOB));
        assert_eq!(o.require_owner(&ALICE), Err(AuthError::NotOwner { caller: ALICE }));
    }

    #[test]
    fn transfer_to_null_rejected() {
        let mut o = Ownership::new(ALICE).unwrap();
        assert_eq!(o.transfer(&ALICE, Address::ZERO), Err(AuthError::NullOwner));
        assert_eq!(o.owner(), Some(ALICE));
    }

    #[test]
    fn renounce_is_a_dead_end() {
        let mut o = Ownership::new(ALICE).unwrap();
        o.renounce(&ALICE).unwrap();
        assert_eq!(o.owner(), None);
        assert_eq!(o.require_owner(&ALICE), Err(AuthError::Renounced));
        assert_eq!(o.transfer(&ALICE, BOB), Err(AuthError::Renounced));
        assert_eq!(o.renounce(&ALICE), Err(AuthError::Renounced));
    }
}
