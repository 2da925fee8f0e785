use crate::{
    amount::Amount, ledger::CommissionReason, milestone::RewardPayout,
    participant::ParticipantId, time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};

pub type OrderId = u64;

/// "Sale approved" event handed over by the checkout subsystem
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleEvent {
    pub order_id: OrderId,
    pub buyer: ParticipantId,
    pub amount: Amount,
    /// Buyer already had a completed order before this one
    pub is_repurchase: bool,
    /// Point value of the ordered products
    pub point_base: Amount,
    pub timestamp: TimestampSeconds,
}

/// Approved sale as stored by the engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub buyer: ParticipantId,
    pub amount: Amount,
    pub point_base: Amount,
    pub is_repurchase: bool,
    pub timestamp: TimestampSeconds,
}

impl From<&SaleEvent> for OrderRecord {
    fn from(sale: &SaleEvent) -> Self {
        Self {
            order_id: sale.order_id,
            buyer: sale.buyer,
            amount: sale.amount,
            point_base: sale.point_base,
            is_repurchase: sale.is_repurchase,
            timestamp: sale.timestamp,
        }
    }
}

/// A single credit made by a cascade
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Distribution {
    pub recipient: ParticipantId,
    pub amount: Amount,
    pub reason: CommissionReason,
}

/// Everything a cascade paid out
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CascadeReport {
    pub order_id: OrderId,
    pub distributions: Vec<Distribution>,
    pub reward_payouts: Vec<RewardPayout>,
    pub total_distributed: Amount,
}

impl CascadeReport {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            ..Default::default()
        }
    }

    pub fn push(&mut self, distribution: Distribution) {
        self.total_distributed = self.total_distributed.saturating_add(distribution.amount);
        self.distributions.push(distribution);
    }

    /// Total credited to a participant by this cascade
    pub fn credited_to(&self, recipient: ParticipantId) -> Amount {
        self.distributions
            .iter()
            .filter(|d| d.recipient == recipient)
            .map(|d| d.amount)
            .sum()
    }

    /// Amounts credited for one reason, in posting order
    pub fn amounts_for(&self, reason: CommissionReason) -> Vec<(ParticipantId, Amount)> {
        self.distributions
            .iter()
            .filter(|d| d.reason == reason)
            .map(|d| (d.recipient, d.amount))
            .collect()
    }
}
