//! Fixed-point scalar with 2^112 fractional bits.
//!
//! `Scaled` wraps a 256-bit unsigned integer holding `value * M` where
//! `M = 2^SCALE_BITS`. Every operation is checked and every division
//! truncates toward zero, so rounding dust always stays in the pool.
//!
//! Headroom: token amounts are `u128`, so `amount * M` needs at most
//! 240 bits. Multiplying that by an elapsed duration or a stake can
//! exceed 256 bits for absurd inputs; those calls fail with
//! [`MathError::Overflow`] rather than wrapping.

use std::fmt;

use ruint::aliases::U256;

use crate::constants::SCALE_BITS;
use crate::error::MathError;
use crate::types::Amount;

/// The multiplier `M = 2^112` (bit 48 of the second 64-bit limb).
pub const SCALE: U256 = U256::from_limbs([0, 1 << (SCALE_BITS - 64), 0, 0]);

/// A non-negative fixed-point value scaled by [`SCALE`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scaled(U256);

impl Scaled {
    pub const ZERO: Self = Self(U256::ZERO);

    /// Exactly one unit.
    pub const ONE: Self = Self(SCALE);

    /// Wrap a raw, already-scaled integer.
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// The raw scaled integer.
    pub const fn raw(&self) -> U256 {
        self.0
    }

    /// `amount * M`.
    pub fn from_amount(amount: Amount) -> Result<Self, MathError> {
        U256::from(amount)
            .checked_mul(SCALE)
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    /// `floor(self / M)`, failing if the result does not fit an [`Amount`].
    pub fn to_amount(self) -> Result<Amount, MathError> {
        let whole = self.0.checked_div(SCALE).ok_or(MathError::DivisionByZero)?;
        u256_to_amount(whole)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        self.0.checked_add(rhs.0).map(Self).ok_or(MathError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, MathError> {
        self.0.checked_sub(rhs.0).map(Self).ok_or(MathError::Underflow)
    }

    /// `floor(self * numerator / denominator)`.
    pub fn mul_div(self, numerator: u128, denominator: u128) -> Result<Self, MathError> {
        if denominator == 0 {
            return Err(MathError::DivisionByZero);
        }
        let product = self
            .0
            .checked_mul(U256::from(numerator))
            .ok_or(MathError::Overflow)?;
        product
            .checked_div(U256::from(denominator))
            .map(Self)
            .ok_or(MathError::DivisionByZero)
    }

    /// `floor(self / divisor)` where `divisor` is an unscaled amount.
    ///
    /// Dividing a scaled reward by an unscaled stake yields the scaled
    /// reward per staked unit.
    pub fn div_amount(self, divisor: Amount) -> Result<Self, MathError> {
        if divisor == 0 {
            return Err(MathError::DivisionByZero);
        }
        self.0
            .checked_div(U256::from(divisor))
            .map(Self)
            .ok_or(MathError::DivisionByZero)
    }

    /// `floor(amount * self / M)`: apply a scaled per-unit ratio to an
    /// unscaled amount and return the unscaled result.
    pub fn apply_to(self, amount: Amount) -> Result<Amount, MathError> {
        let product = U256::from(amount)
            .checked_mul(self.0)
            .ok_or(MathError::Overflow)?;
        Self(product).to_amount()
    }
}

impl fmt::Display for Scaled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Narrow a 256-bit integer to `u128`, failing on any high bits.
fn u256_to_amount(value: U256) -> Result<Amount, MathError> {
    let limbs = value.as_limbs();
    if limbs[2] != 0 || limbs[3] != 0 {
        return Err(MathError::Overflow);
    }
    Ok(((limbs[1] as u128) << 64) | limbs[0] as u128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // --- scale / unscale ---

    #[test]
    fn scale_is_two_pow_112() {
        assert_eq!(SCALE, U256::from(1u8) << 112usize);
        assert_eq!(Scaled::ONE.to_amount().unwrap(), 1);
    }

    #[test]
    fn from_amount_round_trips_max() {
        let s = Scaled::from_amount(u128::MAX).unwrap();
        assert_eq!(s.to_amount().unwrap(), u128::MAX);
    }

    #[test]
    fn to_amount_truncates() {
        let almost_two = Scaled::from_amount(2).unwrap().checked_sub(Scaled::from_raw(U256::from(1u8))).unwrap();
        assert_eq!(almost_two.to_amount().unwrap(), 1);
    }

    #[test]
    fn to_amount_rejects_oversized_values() {
        let huge = Scaled::from_raw(U256::MAX);
        assert_eq!(huge.to_amount(), Err(MathError::Overflow));
    }

    // --- checked arithmetic ---

    #[test]
    fn add_overflow_aborts() {
        let max = Scaled::from_raw(U256::MAX);
        assert_eq!(max.checked_add(Scaled::ONE), Err(MathError::Overflow));
    }

    #[test]
    fn sub_underflow_aborts() {
        assert_eq!(Scaled::ZERO.checked_sub(Scaled::ONE), Err(MathError::Underflow));
    }

    #[test]
    fn mul_div_truncates_toward_zero() {
        // 10 * 1 / 3 = 3.333.. units, stored with 112 fractional bits.
        let third = Scaled::from_amount(10).unwrap().mul_div(1, 3).unwrap();
        assert_eq!(third.to_amount().unwrap(), 3);
        // Three thirds never exceed the original.
        let total = third.checked_add(third).unwrap().checked_add(third).unwrap();
        assert!(total < Scaled::from_amount(10).unwrap());
    }

    #[test]
    fn mul_div_by_zero_fails() {
        assert_eq!(Scaled::ONE.mul_div(1, 0), Err(MathError::DivisionByZero));
        assert_eq!(Scaled::ONE.div_amount(0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn mul_div_overflow_fails() {
        let big = Scaled::from_amount(u128::MAX).unwrap();
        assert_eq!(big.mul_div(u128::MAX, 1), Err(MathError::Overflow));
    }

    #[test]
    fn apply_to_scales_amount() {
        // Ratio 2.5 applied to 4 units = 10.
        let ratio = Scaled::from_amount(5).unwrap().div_amount(2).unwrap();
        assert_eq!(ratio.apply_to(4).unwrap(), 10);
    }

    #[test]
    fn apply_to_tiny_ratio_truncates_to_zero() {
        let dust = Scaled::from_raw(U256::from(1u8));
        assert_eq!(dust.apply_to(1_000).unwrap(), 0);
    }

    // --- properties ---

    proptest! {
        #[test]
        fn divide_then_apply_never_overpays(reward in 1u128..=u64::MAX as u128, stake in 1u128..=u64::MAX as u128) {
            let per_unit = Scaled::from_amount(reward).unwrap().div_amount(stake).unwrap();
            let paid = per_unit.apply_to(stake).unwrap();
            prop_assert!(paid <= reward);
            // Truncation loses at most one unit per division.
            prop_assert!(reward - paid <= 1);
        }

        #[test]
        fn mul_div_splits_are_bounded(amount in 0u128..=u64::MAX as u128, part in 0u64..1_000, rest in 1u64..1_000) {
            let whole = Scaled::from_amount(amount).unwrap();
            let total = (part + rest) as u128;
            let first = whole.mul_div(part as u128, total).unwrap();
            prop_assert!(first <= whole);
        }
    }
}
