//! Protocol constants.

use crate::types::Amount;

/// Number of fractional bits carried by [`Scaled`](crate::fixed::Scaled) values.
///
/// Reward-per-staked-unit ratios are stored as `value * 2^112`, which keeps
/// sub-unit precision when a small reward is spread over a very large stake.
pub const SCALE_BITS: usize = 112;

/// Length of an [`Address`](crate::types::Address) in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Staking cap value meaning "no cap".
pub const UNLIMITED_STAKING_CAP: Amount = 0;
