//! Structured notifications emitted by distributions.
//!
//! Events are recorded only when a call commits, so observers never see a
//! notification for a call that was rolled back.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DistributionEvent {
    Initialized {
        reward_token: Address,
        stakable_token: Address,
        reward_amount: Amount,
        starting_timestamp: Timestamp,
        ending_timestamp: Timestamp,
        locked: bool,
        staking_cap: Amount,
    },
    /// The distribution was canceled before start; `refunded` reward went
    /// back to the owner.
    Canceled { refunded: Amount },
    Staked { staker: Address, amount: Amount },
    Withdrawn { withdrawer: Address, amount: Amount },
    Claimed { claimer: Address, recipient: Address, amount: Amount },
    Recovered { token: Address, recipient: Address, amount: Amount },
    RewardUpdated { token: Address, added: Amount, total: Amount },
    OwnershipTransferred { previous: Option<Address>, new: Option<Address> },
}

impl DistributionEvent {
    /// Short name, matching the serialized `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialized { .. } => "initialized",
            Self::Canceled { .. } => "canceled",
            Self::Staked { .. } => "staked",
            Self::Withdrawn { .. } => "withdrawn",
            Self::Claimed { .. } => "claimed",
            Self::Recovered { .. } => "recovered",
            Self::RewardUpdated { .. } => "reward_updated",
            Self::OwnershipTransferred { .. } => "ownership_transferred",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_tag_matches_name() {
        let events = [
            DistributionEvent::Canceled { refunded: 1 },
            DistributionEvent::Staked { staker: Address::repeat(1), amount: 2 },
            DistributionEvent::RewardUpdated { token: Address::repeat(2), added: 3, total: 4 },
            DistributionEvent::OwnershipTransferred { previous: Some(Address::repeat(1)), new: None },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], event.name());
        }
    }

    #[test]
    fn claimed_event_shape() {
        let event = DistributionEvent::Claimed {
            claimer: Address::repeat(1),
            recipient: Address::repeat(2),
            amount: 900_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["amount"], 900_000);
        assert_eq!(json["recipient"], Address::repeat(2).to_string());
    }
}
