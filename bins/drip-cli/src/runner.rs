//! Replays a scenario against an in-memory token ledger and a factory.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use drip_core::event::DistributionEvent;
use drip_core::token::MemoryTokenLedger;
use drip_core::traits::TokenLedger;
use drip_core::types::{Address, Amount, CallContext, Timestamp};
use drip_core::error::FactoryError;
use drip_engine::staker::StakerSnapshot;
use drip_engine::{Phase, RewardSnapshot};
use drip_factory::{DistributionFactory, DistributionId, FactoryEvent};

use crate::scenario::{Action, Op, Scenario};

#[derive(Debug, Serialize)]
pub struct Report {
    pub distribution: Address,
    pub owner: Option<Address>,
    /// Events recorded while the factory created the distribution.
    pub creation_events: Vec<DistributionEvent>,
    pub steps: Vec<StepOutcome>,
    pub summary: Summary,
}

impl Report {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.error.is_some()).count()
    }
}

#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub at: Timestamp,
    pub caller: Address,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<DistributionEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub factory_events: Vec<FactoryEvent>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    /// Phase at the time of the last action.
    pub phase: Phase,
    pub reward: RewardSnapshot,
    pub total_staked: Amount,
    pub stakers: Vec<StakerSnapshot>,
    pub balances: Vec<BalanceEntry>,
}

#[derive(Debug, Serialize)]
pub struct BalanceEntry {
    pub token: Address,
    pub holder: Address,
    pub amount: Amount,
}

/// Run every action in order. A failing action is recorded and the run
/// continues; only setup failures abort.
pub fn run(scenario: &Scenario) -> Result<Report> {
    let (mut factory, mut tokens, id, creation_events) = setup(scenario)?;
    let address = factory.get(id)?.address();
    info!(%id, %address, actions = scenario.actions.len(), "scenario: distribution created");

    let mut steps = Vec::with_capacity(scenario.actions.len());
    let mut last_at = scenario.distribution.created_at;
    for (index, action) in scenario.actions.iter().enumerate() {
        last_at = action.at;
        let result = apply(&mut factory, &mut tokens, id, action);
        let events = factory.get_mut(id)?.drain_events();
        let factory_events = factory.drain_events();
        let error = match result {
            Ok(()) => {
                debug!(index, op = action.op.name(), caller = %action.caller, "scenario: step applied");
                None
            }
            Err(err) => {
                warn!(index, op = action.op.name(), caller = %action.caller, error = %err, "scenario: step failed");
                Some(err.to_string())
            }
        };
        steps.push(StepOutcome {
            index,
            at: action.at,
            caller: action.caller,
            op: action.op.name(),
            error,
            events,
            factory_events,
        });
    }

    let distribution = factory.get(id)?;
    let summary = Summary {
        phase: distribution.phase(last_at),
        reward: distribution.reward_snapshot()?,
        total_staked: distribution.total_staked_tokens(),
        stakers: distribution.stakers().snapshots(),
        balances: tokens
            .balances()
            .into_iter()
            .map(|(token, holder, amount)| BalanceEntry { token, holder, amount })
            .collect(),
    };
    Ok(Report { distribution: address, owner: distribution.owner(), creation_events, steps, summary })
}

/// Mint the initial balances and let the creator fund a new distribution.
/// Both event journals are drained so that no step inherits the creation
/// events; those are returned separately.
fn setup(
    scenario: &Scenario,
) -> Result<(DistributionFactory, MemoryTokenLedger, DistributionId, Vec<DistributionEvent>)> {
    let mut tokens = MemoryTokenLedger::new();
    for balance in &scenario.balances {
        tokens
            .mint(&balance.token, &balance.holder, balance.amount)
            .with_context(|| format!("Failed to mint initial balance for {}", balance.holder))?;
    }

    let mut factory = DistributionFactory::new(scenario.factory.clone()).context("Invalid factory config")?;
    let creation = &scenario.distribution;
    let config = creation.to_config();
    tokens.approve(&config.reward_token, &creation.creator, &factory.address(), config.reward_amount);
    let id = factory
        .create_distribution(&mut tokens, CallContext::new(creation.creator, creation.created_at), config)
        .context("Failed to create distribution")?;
    factory.drain_events();
    let creation_events = factory.get_mut(id)?.drain_events();
    Ok((factory, tokens, id, creation_events))
}

fn apply(
    factory: &mut DistributionFactory,
    tokens: &mut MemoryTokenLedger,
    id: DistributionId,
    action: &Action,
) -> Result<(), FactoryError> {
    let ctx = CallContext::new(action.caller, action.at);
    let recipient = |r: &Option<Address>| r.unwrap_or(action.caller);
    match &action.op {
        Op::PauseStaking => factory.pause_staking(ctx),
        Op::ResumeStaking => factory.resume_staking(ctx),
        Op::Approve { token, spender, amount } => {
            let spender = match spender {
                Some(spender) => *spender,
                None => factory.get(id)?.address(),
            };
            tokens.approve(token, &action.caller, &spender, *amount);
            Ok(())
        }
        Op::Stake { amount } => Ok(factory.get_mut(id)?.stake(tokens, ctx, *amount)?),
        Op::Withdraw { amount } => Ok(factory.get_mut(id)?.withdraw(tokens, ctx, *amount)?),
        Op::Claim { amount, recipient: r } => Ok(factory.get_mut(id)?.claim(tokens, ctx, *amount, recipient(r))?),
        Op::ClaimAll { recipient: r } => {
            factory.get_mut(id)?.claim_all(tokens, ctx, recipient(r))?;
            Ok(())
        }
        Op::Exit { recipient: r } => {
            factory.get_mut(id)?.exit(tokens, ctx, recipient(r))?;
            Ok(())
        }
        Op::AddReward { amount } => Ok(factory.get_mut(id)?.add_reward(tokens, ctx, *amount)?),
        Op::Consolidate => Ok(factory.get_mut(id)?.consolidate_reward(ctx)?),
        Op::Cancel => {
            factory.get_mut(id)?.cancel(tokens, ctx)?;
            Ok(())
        }
        Op::RecoverAfterCancel => {
            factory.get_mut(id)?.recover_reward_after_cancel(tokens, ctx)?;
            Ok(())
        }
        Op::RecoverUnassigned => {
            factory.get_mut(id)?.recover_unassigned_reward(tokens, ctx)?;
            Ok(())
        }
        Op::TransferOwnership { new_owner } => Ok(factory.get_mut(id)?.transfer_ownership(ctx, *new_owner)?),
        Op::RenounceOwnership => Ok(factory.get_mut(id)?.renounce_ownership(ctx)?),
    }
}

/// Claimable reward of `account` at `at` after replaying the scenario.
pub fn claimable_after(scenario: &Scenario, account: &Address, at: Timestamp) -> Result<Amount> {
    // Replays from scratch; scenarios are small.
    let (mut factory, mut tokens, id, _) = setup(scenario)?;
    for action in &scenario.actions {
        if let Err(err) = apply(&mut factory, &mut tokens, id, action) {
            debug!(op = action.op.name(), error = %err, "scenario: step failed");
        }
    }
    Ok(factory.get(id)?.claimable_reward(account, at)?)
}
