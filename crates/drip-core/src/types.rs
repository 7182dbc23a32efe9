//! Core protocol types: addresses, amounts, call context, distribution config.
//!
//! Token amounts are `u128` in the token's smallest unit. Timestamps are
//! Unix seconds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{ADDRESS_LEN, UNLIMITED_STAKING_CAP};
use crate::error::{AddressError, ConfigError};

/// Token amount in the token's smallest unit.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// A 20-byte account or token identifier.
///
/// The all-zero address is the null identity: it is never a valid token,
/// recipient or owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The null address.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    /// Create an address from raw bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Address with every byte set to `seed`. Handy for fixtures.
    pub fn repeat(seed: u8) -> Self {
        Self([seed; ADDRESS_LEN])
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Check if this is the null address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let array: [u8; ADDRESS_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

/// Who is calling an entry point, and at which instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

/// Parameters fixed once at initialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Token paid out as reward.
    pub reward_token: Address,
    /// Token participants lock up.
    pub stakable_token: Address,
    /// Initial reward pool, in reward-token units.
    pub reward_amount: Amount,
    /// First instant at which staking is accepted.
    pub starting_timestamp: Timestamp,
    /// Instant at which the reward stream is fully distributed.
    pub ending_timestamp: Timestamp,
    /// When set, withdrawals are refused until after `ending_timestamp`.
    pub locked: bool,
    /// Ceiling on the total staked amount; [`UNLIMITED_STAKING_CAP`] disables it.
    pub staking_cap: Amount,
}

impl DistributionConfig {
    /// Check the parameters against the time of initialization.
    ///
    /// Funding is checked separately since it needs the token ledger.
    pub fn validate(&self, now: Timestamp) -> Result<(), ConfigError> {
        if self.reward_token.is_zero() {
            return Err(ConfigError::ZeroRewardToken);
        }
        if self.reward_amount == 0 {
            return Err(ConfigError::ZeroRewardAmount);
        }
        if self.stakable_token.is_zero() {
            return Err(ConfigError::ZeroStakableToken);
        }
        if self.starting_timestamp <= now {
            return Err(ConfigError::StartNotInFuture { start: self.starting_timestamp, now });
        }
        if self.ending_timestamp <= self.starting_timestamp {
            return Err(ConfigError::EndNotAfterStart {
                start: self.starting_timestamp,
                end: self.ending_timestamp,
            });
        }
        Ok(())
    }

    /// Length of the distribution window in seconds.
    pub fn seconds_duration(&self) -> u64 {
        self.ending_timestamp.saturating_sub(self.starting_timestamp)
    }

    /// Whether a staking cap is enforced.
    pub fn has_staking_cap(&self) -> bool {
        self.staking_cap != UNLIMITED_STAKING_CAP
    }
}
