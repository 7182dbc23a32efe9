//! Distribution registry.
//!
//! The factory creates every distribution from the same template: derive a
//! fresh address, move the requester's reward funding into it, initialize it
//! while the factory still owns it, then hand ownership to the requester.
//! Instances share nothing except the read side of the pause switch.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use drip_core::constants::ADDRESS_LEN;
use drip_core::error::{AuthError, DistributionError, FactoryError, StateError};
use drip_core::traits::TokenLedger;
use drip_core::types::{Address, Amount, CallContext, DistributionConfig};
use drip_engine::{Distribution, Ownership};

use crate::config::FactoryConfig;
use crate::pause::PauseSwitch;

/// Sequential identifier of a distribution within one factory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DistributionId(pub u64);

impl fmt::Display for DistributionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FactoryEvent {
    DistributionCreated {
        id: DistributionId,
        address: Address,
        owner: Address,
        reward_token: Address,
        stakable_token: Address,
        reward_amount: Amount,
    },
    StakingPaused,
    StakingResumed,
    OwnershipTransferred { previous: Option<Address>, new: Option<Address> },
}

/// Deterministic instance address: the first 20 bytes of
/// `blake3(namespace || factory || id_le)`.
pub fn derive_address(namespace: &str, factory: &Address, id: DistributionId) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(namespace.as_bytes());
    hasher.update(factory.as_bytes());
    hasher.update(&id.0.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_LEN]);
    Address(bytes)
}

pub struct DistributionFactory {
    config: FactoryConfig,
    ownership: Ownership,
    pause: PauseSwitch,
    distributions: BTreeMap<DistributionId, Distribution>,
    by_address: BTreeMap<Address, DistributionId>,
    next_id: u64,
    events: Vec<FactoryEvent>,
}

impl fmt::Debug for DistributionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributionFactory")
            .field("address", &self.config.address)
            .field("ownership", &self.ownership)
            .field("paused", &self.pause.is_paused())
            .field("distributions", &self.distributions.len())
            .finish_non_exhaustive()
    }
}

impl DistributionFactory {
    pub fn new(config: FactoryConfig) -> Result<Self, FactoryError> {
        let ownership = Ownership::new(config.owner)?;
        Ok(Self {
            config,
            ownership,
            pause: PauseSwitch::new(),
            distributions: BTreeMap::new(),
            by_address: BTreeMap::new(),
            next_id: 0,
            events: Vec::new(),
        })
    }

    /// Create, fund and initialize a distribution owned by the caller.
    ///
    /// The caller must have approved the factory address for
    /// `config.reward_amount` of the reward token.
    pub fn create_distribution<T: TokenLedger + ?Sized>(
        &mut self,
        tokens: &mut T,
        ctx: CallContext,
        config: DistributionConfig,
    ) -> Result<DistributionId, FactoryError> {
        if ctx.caller.is_zero() {
            return Err(AuthError::NullOwner.into());
        }
        config.validate(ctx.now).map_err(DistributionError::from)?;

        let id = DistributionId(self.next_id);
        let factory = self.config.address;
        let address = derive_address(&self.config.namespace, &factory, id);
        let mut distribution = Distribution::new(address, factory, Arc::new(self.pause.clone()))?;

        let (token, amount) = (config.reward_token, config.reward_amount);
        let (reward_token, stakable_token) = (config.reward_token, config.stakable_token);
        tokens.transfer_from(&token, &factory, &ctx.caller, &address, amount)?;
        if let Err(err) = distribution.initialize(&*tokens, CallContext::new(factory, ctx.now), config) {
            warn!(%id, %address, error = %err, "factory: initialize failed, returning funding");
            tokens.transfer(&token, &address, &ctx.caller, amount)?;
            return Err(err.into());
        }
        distribution.transfer_ownership(CallContext::new(factory, ctx.now), ctx.caller)?;

        self.next_id += 1;
        self.distributions.insert(id, distribution);
        self.by_address.insert(address, id);
        self.events.push(FactoryEvent::DistributionCreated {
            id,
            address,
            owner: ctx.caller,
            reward_token,
            stakable_token,
            reward_amount: amount,
        });
        info!(%id, %address, owner = %ctx.caller, reward_amount = amount, "factory: distribution created");
        Ok(id)
    }

    pub fn pause_staking(&mut self, ctx: CallContext) -> Result<(), FactoryError> {
        self.ownership.require_owner(&ctx.caller)?;
        if self.pause.is_paused() {
            return Err(StateError::AlreadyPaused.into());
        }
        self.pause.set(true);
        self.events.push(FactoryEvent::StakingPaused);
        info!(by = %ctx.caller, "factory: staking paused");
        Ok(())
    }

    pub fn resume_staking(&mut self, ctx: CallContext) -> Result<(), FactoryError> {
        self.ownership.require_owner(&ctx.caller)?;
        if !self.pause.is_paused() {
            return Err(StateError::NotPaused.into());
        }
        self.pause.set(false);
        self.events.push(FactoryEvent::StakingResumed);
        info!(by = %ctx.caller, "factory: staking resumed");
        Ok(())
    }

    pub fn staking_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn transfer_ownership(&mut self, ctx: CallContext, new_owner: Address) -> Result<(), FactoryError> {
        let previous = self.ownership.transfer(&ctx.caller, new_owner)?;
        self.events.push(FactoryEvent::OwnershipTransferred {
            previous: Some(previous),
            new: Some(new_owner),
        });
        info!(%previous, new = %new_owner, "factory: ownership transferred");
        Ok(())
    }

    pub fn renounce_ownership(&mut self, ctx: CallContext) -> Result<(), FactoryError> {
        let previous = self.ownership.renounce(&ctx.caller)?;
        self.events.push(FactoryEvent::OwnershipTransferred { previous: Some(previous), new: None });
        info!(%previous, "factory: ownership renounced");
        Ok(())
    }

    // --- lookup ---

    pub fn get(&self, id: DistributionId) -> Result<&Distribution, FactoryError> {
        self.distributions
            .get(&id)
            .ok_or_else(|| FactoryError::UnknownDistribution(id.to_string()))
    }

    pub fn get_mut(&mut self, id: DistributionId) -> Result<&mut Distribution, FactoryError> {
        self.distributions
            .get_mut(&id)
            .ok_or_else(|| FactoryError::UnknownDistribution(id.to_string()))
    }

    pub fn by_address(&self, address: &Address) -> Option<DistributionId> {
        self.by_address.get(address).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = DistributionId> + '_ {
        self.distributions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn owner(&self) -> Option<Address> {
        self.ownership.owner()
    }

    pub fn events(&self) -> &[FactoryEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<FactoryEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drip_core::error::{ConfigError, TokenError};
    use drip_core::token::MemoryTokenLedger;

    const REWARD: Address = Address([0x01; 20]);
    const STAKABLE: Address = Address([0x02; 20]);
    const ALICE: Address = Address([0x11; 20]);
    const BOB: Address = Address([0x22; 20]);

    fn factory() -> DistributionFactory {
        DistributionFactory::new(FactoryConfig::default()).unwrap()
    }

    fn owner() -> Address {
        FactoryConfig::default().owner
    }

    fn config() -> DistributionConfig {
        DistributionConfig {
            reward_token: REWARD,
            stakable_token: STAKABLE,
            reward_amount: 1_000,
            starting_timestamp: 100,
            ending_timestamp: 200,
            locked: false,
            staking_cap: 0,
        }
    }

    fn tokens_for(f: &DistributionFactory) -> MemoryTokenLedger {
        let mut tokens = MemoryTokenLedger::new();
        tokens.mint(&REWARD, &ALICE, 10_000).unwrap();
        tokens.approve(&REWARD, &ALICE, &f.address(), 10_000);
        tokens.mint(&STAKABLE, &BOB, 500).unwrap();
        tokens
    }

    // --- creation ---

    #[test]
    fn create_funds_and_hands_over() {
        let mut f = factory();
        let mut tokens = tokens_for(&f);
        let id = f.create_distribution(&mut tokens, CallContext::new(ALICE, 10), config()).unwrap();

        let d = f.get(id).unwrap();
        assert!(d.is_initialized());
        assert_eq!(d.owner(), Some(ALICE));
        assert_eq!(tokens.balance_of(&REWARD, &d.address()), 1_000);
        assert_eq!(tokens.balance_of(&REWARD, &ALICE), 9_000);
        assert_eq!(f.by_address(&d.address()), Some(id));
        assert!(matches!(f.events()[0], FactoryEvent::DistributionCreated { owner: ALICE, .. }));
    }

    #[test]
    fn instances_get_distinct_addresses() {
        let mut f = factory();
        let mut tokens = tokens_for(&f);
        let a = f.create_distribution(&mut tokens, CallContext::new(ALICE, 10), config()).unwrap();
        let b = f.create_distribution(&mut tokens, CallContext::new(ALICE, 10), config()).unwrap();
        assert_ne!(f.get(a).unwrap().address(), f.get(b).unwrap().address());
        assert_eq!(f.ids().collect::<Vec<_>>(), vec![DistributionId(0), DistributionId(1)]);
    }

    #[test]
    fn derived_address_is_deterministic() {
        let factory = Address::repeat(7);
        assert_eq!(
            derive_address("ns", &factory, DistributionId(3)),
            derive_address("ns", &factory, DistributionId(3))
        );
        assert_ne!(
            derive_address("ns", &factory, DistributionId(3)),
            derive_address("other", &factory, DistributionId(3))
        );
    }

    #[test]
    fn create_without_allowance_registers_nothing() {
        let mut f = factory();
        let mut tokens = tokens_for(&f);
        tokens.approve(&REWARD, &ALICE, &f.address(), 10);
        let err = f.create_distribution(&mut tokens, CallContext::new(ALICE, 10), config()).unwrap_err();
        assert!(matches!(err, FactoryError::Token(TokenError::InsufficientAllowance { .. })));
        assert!(f.is_empty());
        assert_eq!(tokens.balance_of(&REWARD, &ALICE), 10_000);
    }

    #[test]
    fn create_rejects_invalid_config() {
        let mut f = factory();
        let mut tokens = tokens_for(&f);
        let err = f.create_distribution(&mut tokens, CallContext::new(ALICE, 150), config()).unwrap_err();
        assert_eq!(
            err,
            FactoryError::Distribution(ConfigError::StartNotInFuture { start: 100, now: 150 }.into())
        );
    }

    #[test]
    fn unknown_id_is_an_error() {
        assert_eq!(
            factory().get(DistributionId(9)).unwrap_err(),
            FactoryError::UnknownDistribution("#9".into())
        );
    }

    // --- pause ---

    #[test]
    fn pause_blocks_stake_on_every_instance() {
        let mut f = factory();
        let mut tokens = tokens_for(&f);
        let id = f.create_distribution(&mut tokens, CallContext::new(ALICE, 10), config()).unwrap();
        let dist_addr = f.get(id).unwrap().address();
        tokens.approve(&STAKABLE, &BOB, &dist_addr, 500);

        f.pause_staking(CallContext::new(owner(), 10)).unwrap();
        assert!(f.staking_paused());
        let err = f.get_mut(id).unwrap().stake(&mut tokens, CallContext::new(BOB, 100), 50);
        assert_eq!(err, Err(StateError::StakingPaused.into()));

        f.resume_staking(CallContext::new(owner(), 11)).unwrap();
        f.get_mut(id).unwrap().stake(&mut tokens, CallContext::new(BOB, 100), 50).unwrap();
        assert_eq!(f.get(id).unwrap().staked_tokens_of(&BOB), 50);
    }

    #[test]
    fn pause_and_resume_are_not_repeatable() {
        let mut f = factory();
        let ctx = CallContext::new(owner(), 0);
        assert_eq!(f.resume_staking(ctx), Err(StateError::NotPaused.into()));
        f.pause_staking(ctx).unwrap();
        assert_eq!(f.pause_staking(ctx), Err(StateError::AlreadyPaused.into()));
    }

    #[test]
    fn pause_is_owner_only() {
        let mut f = factory();
        assert_eq!(
            f.pause_staking(CallContext::new(ALICE, 0)),
            Err(AuthError::NotOwner { caller: ALICE }.into())
        );
        f.renounce_ownership(CallContext::new(owner(), 0)).unwrap();
        assert_eq!(f.pause_staking(CallContext::new(owner(), 0)), Err(AuthError::Renounced.into()));
        assert_eq!(f.owner(), None);
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(FactoryEvent::StakingPaused).unwrap();
        assert_eq!(json["event"], "staking_paused");
    }
}
