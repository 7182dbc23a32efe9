//! Error types for Drip distributions.
//!
//! Every error aborts the whole call: entry points stage their ledger
//! changes and only commit them once nothing can fail any more.
use thiserror::Error;

use crate::types::{Address, Amount, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")] Overflow,
    #[error("arithmetic underflow")] Underflow,
    #[error("division by zero")] DivisionByZero,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid length: {0} bytes")] InvalidLength(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient balance of {token} for {holder}: have {have}, need {need}")]
    InsufficientBalance { token: Address, holder: Address, have: Amount, need: Amount },
    #[error("insufficient allowance of {token} from {owner} to {spender}: have {have}, need {need}")]
    InsufficientAllowance { token: Address, owner: Address, spender: Address, have: Amount, need: Amount },
    #[error("transfer to or from the null account")] NullAccount,
    #[error("balance overflow for {token}")] BalanceOverflow { token: Address },
}

/// Invalid distribution parameters, rejected by `initialize`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("starting timestamp {start} is not in the future (now {now})")] StartNotInFuture { start: Timestamp, now: Timestamp },
    #[error("ending timestamp {end} is not after starting timestamp {start}")] EndNotAfterStart { start: Timestamp, end: Timestamp },
    #[error("reward token is the null address")] ZeroRewardToken,
    #[error("reward amount is zero")] ZeroRewardAmount,
    #[error("stakable token is the null address")] ZeroStakableToken,
    #[error("insufficient funding: have {have}, need {need}")] InsufficientFunding { have: Amount, need: Amount },
}

/// Operation invoked outside its lifecycle window.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimingError {
    #[error("distribution is not initialized")] NotInitialized,
    #[error("distribution not started: starts at {start}, now {now}")] NotStarted { start: Timestamp, now: Timestamp },
    #[error("distribution ended at {end}, now {now}")] Ended { end: Timestamp, now: Timestamp },
    #[error("distribution is canceled")] Canceled,
    #[error("distribution is not canceled")] NotCanceled,
    #[error("stake is locked until {end}, now {now}")] Locked { end: Timestamp, now: Timestamp },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("amount is zero")] ZeroAmount,
    #[error("staking cap exceeded: cap {cap}, staked {staked}, requested {requested}")] StakingCapExceeded { cap: Amount, staked: Amount, requested: Amount },
    #[error("withdrawal exceeds stake: staked {staked}, requested {requested}")] WithdrawExceedsStake { staked: Amount, requested: Amount },
    #[error("claim exceeds claimable reward: claimable {claimable}, requested {requested}")] ClaimExceedsClaimable { claimable: Amount, requested: Amount },
    #[error("recipient is the null address")] NullRecipient,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("caller {caller} is not the owner")] NotOwner { caller: Address },
    #[error("ownership has been renounced")] Renounced,
    #[error("new owner is the null address")] NullOwner,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("already initialized")] AlreadyInitialized,
    #[error("already canceled")] AlreadyCanceled,
    #[error("cannot cancel after start: started at {start}, now {now}")] CancelAfterStart { start: Timestamp, now: Timestamp },
    #[error("staking is paused")] StakingPaused,
    #[error("staking already paused")] AlreadyPaused,
    #[error("staking not paused")] NotPaused,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Timing(#[from] TimingError),
    #[error(transparent)] Value(#[from] ValueError),
    #[error(transparent)] Auth(#[from] AuthError),
    #[error(transparent)] State(#[from] StateError),
    #[error(transparent)] Math(#[from] MathError),
    #[error(transparent)] Token(#[from] TokenError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    #[error("unknown distribution: {0}")] UnknownDistribution(String),
    #[error(transparent)] Distribution(#[from] DistributionError),
    #[error(transparent)] Auth(#[from] AuthError),
    #[error(transparent)] State(#[from] StateError),
    #[error(transparent)] Token(#[from] TokenError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn umbrella_is_transparent() {
        let err: DistributionError = ValueError::ZeroAmount.into();
        assert_eq!(err.to_string(), "amount is zero");
        assert!(matches!(err, DistributionError::Value(ValueError::ZeroAmount)));
    }

    #[test]
    fn factory_wraps_distribution_errors() {
        let err: FactoryError = DistributionError::from(MathError::Overflow).into();
        assert_eq!(err.to_string(), "arithmetic overflow");
    }

    #[test]
    fn messages_carry_context() {
        let err = ValueError::WithdrawExceedsStake { staked: 5, requested: 7 };
        assert_eq!(err.to_string(), "withdrawal exceeds stake: staked 5, requested 7");
    }
}
