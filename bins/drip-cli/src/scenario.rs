//! Scenario files: initial balances, one distribution and a timeline of calls.
//!
//! Loaded through the `config` crate, so TOML, JSON and YAML all work and any
//! key can be overridden from the environment with `DRIP__<SECTION>__<KEY>`
//! (for example `DRIP__DISTRIBUTION__LOCKED=true`).
//!
//! Amounts are plain integers or, beyond the range of a TOML integer, decimal
//! strings (`amount = "5000000000000000000000"`).

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use drip_core::types::{Address, Amount, DistributionConfig, Timestamp};
use drip_factory::FactoryConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub factory: FactoryConfig,
    pub distribution: DistributionSpec,
    #[serde(default)]
    pub balances: Vec<Balance>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// The distribution to create, plus who asks for it and when.
#[derive(Debug, Clone, Deserialize)]
pub struct DistributionSpec {
    pub creator: Address,
    #[serde(default)]
    pub created_at: Timestamp,
    pub reward_token: Address,
    pub stakable_token: Address,
    #[serde(with = "amount")]
    pub reward_amount: Amount,
    pub starting_timestamp: Timestamp,
    pub ending_timestamp: Timestamp,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, with = "amount")]
    pub staking_cap: Amount,
}

impl DistributionSpec {
    pub fn to_config(&self) -> DistributionConfig {
        DistributionConfig {
            reward_token: self.reward_token,
            stakable_token: self.stakable_token,
            reward_amount: self.reward_amount,
            starting_timestamp: self.starting_timestamp,
            ending_timestamp: self.ending_timestamp,
            locked: self.locked,
            staking_cap: self.staking_cap,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Balance {
    pub token: Address,
    pub holder: Address,
    #[serde(with = "amount")]
    pub amount: Amount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Action {
    pub at: Timestamp,
    pub caller: Address,
    pub op: Op,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Op {
    /// Grant an allowance. Without `spender` the distribution is approved.
    Approve {
        token: Address,
        spender: Option<Address>,
        #[serde(with = "amount")]
        amount: Amount,
    },
    Stake {
        #[serde(with = "amount")]
        amount: Amount,
    },
    Withdraw {
        #[serde(with = "amount")]
        amount: Amount,
    },
    Claim {
        #[serde(with = "amount")]
        amount: Amount,
        recipient: Option<Address>,
    },
    ClaimAll { recipient: Option<Address> },
    Exit { recipient: Option<Address> },
    AddReward {
        #[serde(with = "amount")]
        amount: Amount,
    },
    Consolidate,
    Cancel,
    RecoverAfterCancel,
    RecoverUnassigned,
    PauseStaking,
    ResumeStaking,
    TransferOwnership { new_owner: Address },
    RenounceOwnership,
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::Stake { .. } => "stake",
            Self::Withdraw { .. } => "withdraw",
            Self::Claim { .. } => "claim",
            Self::ClaimAll { .. } => "claim_all",
            Self::Exit { .. } => "exit",
            Self::AddReward { .. } => "add_reward",
            Self::Consolidate => "consolidate",
            Self::Cancel => "cancel",
            Self::RecoverAfterCancel => "recover_after_cancel",
            Self::RecoverUnassigned => "recover_unassigned",
            Self::PauseStaking => "pause_staking",
            Self::ResumeStaking => "resume_staking",
            Self::TransferOwnership { .. } => "transfer_ownership",
            Self::RenounceOwnership => "renounce_ownership",
        }
    }
}

/// Token amounts as integers or decimal strings.
mod amount {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::Deserializer;

    use drip_core::types::Amount;

    struct AmountVisitor;

    impl Visitor<'_> for AmountVisitor {
        type Value = Amount;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
            Ok(Amount::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
            u64::try_from(v)
                .map(Amount::from)
                .map_err(|_| E::custom(format!("negative amount {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
            v.trim()
                .replace('_', "")
                .parse()
                .map_err(|_| E::custom(format!("invalid amount {v:?}")))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

/// Load a scenario file, applying `DRIP__*` environment overrides.
pub fn load(path: &Path) -> Result<Scenario> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("DRIP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to read scenario: {}", path.display()))?;
    settings
        .try_deserialize()
        .with_context(|| format!("Invalid scenario: {}", path.display()))
}
