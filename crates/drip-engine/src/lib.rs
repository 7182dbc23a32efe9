//! # drip-engine: Streaming reward accrual for staking distributions.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! A distribution streams a reward pool over `[start, end]`. Each period
//! between two consolidations receives `elapsed / duration_left` of the mass
//! still to distribute, split across stakers through a global
//! reward-per-staked-unit accumulator:
//! - [`reward_ledger::RewardLedger`]: pool totals and the accumulator
//! - [`staker::StakerLedger`]: per-account stake and reward state
//! - [`accrual`]: lazy consolidation and the read-only projection
//! - [`lifecycle::Lifecycle`]: which entry points are open when
//! - [`ownership::Ownership`]: single-owner access control
//! - [`settlement`]: staged state and batched token transfers of one call
//! - [`distribution::Distribution`]: the guarded entry points

pub mod accrual;
pub mod distribution;
pub mod lifecycle;
pub mod ownership;
pub mod reward_ledger;
pub mod settlement;
pub mod staker;

pub use distribution::Distribution;
pub use lifecycle::{Lifecycle, Phase};
pub use ownership::Ownership;
pub use reward_ledger::{RewardLedger, RewardSnapshot};
pub use staker::{StakerEntity, StakerLedger};
