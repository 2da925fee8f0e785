use crate::{
    amount::Amount,
    participant::{ParticipantId, Position},
    sale::OrderId,
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Cumulative left/right team sales of a participant.
///
/// Unlike leg volumes these totals never decrease; `matched_volume_consumed`
/// remembers how much of the matched volume already produced milestone rewards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamSalesProgress {
    pub participant: ParticipantId,
    pub left_team_sales: Amount,
    pub right_team_sales: Amount,
    pub matched_volume_consumed: Amount,
}

impl TeamSalesProgress {
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            ..Default::default()
        }
    }

    pub fn add_sales(&mut self, position: Position, amount: Amount) {
        let total = match position {
            Position::Left => &mut self.left_team_sales,
            Position::Right => &mut self.right_team_sales,
        };
        *total = total.saturating_add(amount);
    }

    /// min(left, right)
    pub fn matched_volume(&self) -> Amount {
        self.left_team_sales.min(self.right_team_sales)
    }
}

/// Shared funds fed by milestone rewards
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Fund {
    Travel,
    Car,
    House,
}

impl Fund {
    pub fn id(&self) -> u8 {
        match self {
            Self::Travel => 0,
            Self::Car => 1,
            Self::House => 2,
        }
    }
}

/// One-time record of a crossed milestone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardPayout {
    pub participant: ParticipantId,
    pub milestone: Amount,
    pub rank_label: String,
    pub reward: String,
    pub royalty_amount: Amount,
    pub travel_amount: Amount,
    pub car_amount: Amount,
    pub house_amount: Amount,
    pub timestamp: TimestampSeconds,
    pub order: Option<OrderId>,
}

impl RewardPayout {
    pub fn fund_amount(&self, fund: Fund) -> Amount {
        match fund {
            Fund::Travel => self.travel_amount,
            Fund::Car => self.car_amount,
            Fund::House => self.house_amount,
        }
    }
}

/// Posting into a shared fund
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FundContribution {
    pub id: u64,
    pub fund: Fund,
    pub participant: ParticipantId,
    pub milestone: Amount,
    pub amount: Amount,
    pub timestamp: TimestampSeconds,
}
