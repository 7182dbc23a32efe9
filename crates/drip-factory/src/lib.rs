//! # drip-factory: Creates distributions and owns the staking pause switch.
//!
//! - [`config::FactoryConfig`]: factory address, owner and address namespace
//! - [`pause::PauseSwitch`]: the global flag every distribution reads on `stake`
//! - [`registry::DistributionFactory`]: creation, funding and lookup of instances

pub mod config;
pub mod pause;
pub mod registry;

pub use config::FactoryConfig;
pub use pause::PauseSwitch;
pub use registry::{derive_address, DistributionFactory, DistributionId, FactoryEvent};
