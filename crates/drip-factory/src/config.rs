//! Factory configuration.

use serde::{Deserialize, Serialize};

use drip_core::types::Address;

/// Configuration for a distribution factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Account the factory acts as when funding and initializing instances.
    pub address: Address,
    /// Initial factory owner, allowed to pause and resume staking.
    pub owner: Address,
    /// Mixed into every derived instance address so two factories never
    /// hand out the same one.
    pub namespace: String,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            address: Address::repeat(0xfa),
            owner: Address::repeat(0x0a),
            namespace: "drip-distribution".to_string(),
        }
    }
}
