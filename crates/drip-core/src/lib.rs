//! # drip-core
//! Foundation types and traits for Drip staking reward distributions.
//!
//! All reward arithmetic is integer-only. Ratios use the [`fixed::Scaled`]
//! type (2^112 fractional bits over a 256-bit integer) and every operation
//! is checked: overflow aborts the call instead of wrapping.

pub mod constants;
pub mod error;
pub mod event;
pub mod fixed;
pub mod token;
pub mod traits;
pub mod types;

pub use error::DistributionError;
pub use fixed::Scaled;
pub use types::{Address, Amount, CallContext, DistributionConfig, Timestamp};
