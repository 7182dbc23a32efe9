//! Shared test helpers for scenario and property tests.

use drip_core::error::DistributionError;
use drip_core::token::MemoryTokenLedger;
use drip_core::traits::TokenLedger;
use drip_core::types::{Address, Amount, CallContext, DistributionConfig, Timestamp};
use drip_engine::Distribution;
use drip_factory::{DistributionFactory, DistributionId, FactoryConfig};

pub const REWARD: Address = Address([0x01; 20]);
pub const STAKABLE: Address = Address([0x02; 20]);
pub const CREATOR: Address = Address([0xc0; 20]);
pub const START: Timestamp = 1_000;
pub const END: Timestamp = 1_100;

/// Distinct non-null account from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address::repeat(seed)
}

pub fn config(reward_amount: Amount) -> DistributionConfig {
    DistributionConfig {
        reward_token: REWARD,
        stakable_token: STAKABLE,
        reward_amount,
        starting_timestamp: START,
        ending_timestamp: END,
        locked: false,
        staking_cap: 0,
    }
}

pub fn factory_owner() -> Address {
    FactoryConfig::default().owner
}

/// A factory with one funded distribution owned by [`CREATOR`].
pub struct World {
    pub tokens: MemoryTokenLedger,
    pub factory: DistributionFactory,
    pub id: DistributionId,
}

impl World {
    /// Create the distribution at time 0. Every staker gets `stakable` tokens
    /// and approves the distribution for all of them.
    pub fn new(config: DistributionConfig, stakers: &[(Address, Amount)]) -> Self {
        let mut tokens = MemoryTokenLedger::new();
        let mut factory = DistributionFactory::new(FactoryConfig::default()).unwrap();

        tokens.mint(&config.reward_token, &CREATOR, config.reward_amount).unwrap();
        tokens.approve(&config.reward_token, &CREATOR, &factory.address(), config.reward_amount);
        let stakable = config.stakable_token;
        let id = factory
            .create_distribution(&mut tokens, CallContext::new(CREATOR, 0), config)
            .unwrap();

        let this = factory.get(id).unwrap().address();
        for (staker, amount) in stakers {
            tokens.mint(&stakable, staker, *amount).unwrap();
            tokens.approve(&stakable, staker, &this, *amount);
        }
        Self { tokens, factory, id }
    }

    pub fn dist(&self) -> &Distribution {
        self.factory.get(self.id).unwrap()
    }

    pub fn dist_mut(&mut self) -> &mut Distribution {
        self.factory.get_mut(self.id).unwrap()
    }

    pub fn address(&self) -> Address {
        self.dist().address()
    }

    pub fn stake(&mut self, who: Address, at: Timestamp, amount: Amount) -> Result<(), DistributionError> {
        let dist = self.factory.get_mut(self.id).unwrap();
        dist.stake(&mut self.tokens, CallContext::new(who, at), amount)
    }

    pub fn withdraw(&mut self, who: Address, at: Timestamp, amount: Amount) -> Result<(), DistributionError> {
        let dist = self.factory.get_mut(self.id).unwrap();
        dist.withdraw(&mut self.tokens, CallContext::new(who, at), amount)
    }

    pub fn claim(&mut self, who: Address, at: Timestamp, amount: Amount) -> Result<(), DistributionError> {
        let dist = self.factory.get_mut(self.id).unwrap();
        dist.claim(&mut self.tokens, CallContext::new(who, at), amount, who)
    }

    pub fn claim_all(&mut self, who: Address, at: Timestamp) -> Result<Amount, DistributionError> {
        let dist = self.factory.get_mut(self.id).unwrap();
        dist.claim_all(&mut self.tokens, CallContext::new(who, at), who)
    }

    pub fn exit(&mut self, who: Address, at: Timestamp) -> Result<(Amount, Amount), DistributionError> {
        let dist = self.factory.get_mut(self.id).unwrap();
        dist.exit(&mut self.tokens, CallContext::new(who, at), who)
    }

    pub fn add_reward(&mut self, who: Address, at: Timestamp, amount: Amount) -> Result<(), DistributionError> {
        let this = self.address();
        let token = self.dist().reward_token().unwrap();
        self.tokens.mint(&token, &who, amount).unwrap();
        self.tokens.approve(&token, &who, &this, amount);
        let dist = self.factory.get_mut(self.id).unwrap();
        dist.add_reward(&mut self.tokens, CallContext::new(who, at), amount)
    }

    pub fn recover_unassigned(&mut self, at: Timestamp) -> Result<Amount, DistributionError> {
        let dist = self.factory.get_mut(self.id).unwrap();
        dist.recover_unassigned_reward(&mut self.tokens, CallContext::new(CREATOR, at))
    }

    pub fn claimable(&self, who: Address, at: Timestamp) -> Amount {
        self.dist().claimable_reward(&who, at).unwrap()
    }

    pub fn balance(&self, token: Address, holder: Address) -> Amount {
        self.tokens.balance_of(&token, &holder)
    }

    /// Sum of every staker's stake, computed from the staker ledger entries.
    pub fn sum_of_stakes(&self) -> Amount {
        self.dist().stakers().iter().map(|(_, s)| s.stake()).sum()
    }
}
