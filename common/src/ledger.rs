// Ledger records
//
// The commission ledger and the wallet ledger are append-only. The balances
// cached on the participant record are a projection of these rows and can
// always be recomputed from them.

use crate::{
    amount::Amount, participant::ParticipantId, rank::Rank, sale::OrderId,
    time::TimestampSeconds,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type EntryId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

/// Category tag of a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionReason {
    DirectSponsorBonus,
    /// Level 1 is the sponsor's sponsor
    IndirectSponsorBonus(u8),
    BinaryCommission,
    MatchingBonus,
    LeadershipBonus,
    RankAchievementBonus(Rank),
    /// Level 0 is the purchaser
    RepurchaseCommission(u8),
    RankRewardRoyalty,
    ManualAdjustment,
    Withdrawal,
}

impl fmt::Display for CommissionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectSponsorBonus => write!(f, "Direct Sponsor Bonus"),
            Self::IndirectSponsorBonus(level) => write!(f, "Indirect Sponsor Bonus L{}", level),
            Self::BinaryCommission => write!(f, "Binary Commission"),
            Self::MatchingBonus => write!(f, "Matching Bonus"),
            Self::LeadershipBonus => write!(f, "Leadership Bonus"),
            Self::RankAchievementBonus(_) => write!(f, "Rank Achievement Bonus"),
            Self::RepurchaseCommission(level) => write!(f, "Repurchase Commission L{}", level),
            Self::RankRewardRoyalty => write!(f, "Rank Reward Royalty"),
            Self::ManualAdjustment => write!(f, "Manual Adjustment"),
            Self::Withdrawal => write!(f, "Withdrawal"),
        }
    }
}

/// One immutable row of the commission or wallet ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Global posting sequence, shared by both ledgers
    pub id: EntryId,
    pub participant: ParticipantId,
    pub direction: Direction,
    pub amount: Amount,
    pub reason: CommissionReason,
    pub remark: String,
    pub timestamp: TimestampSeconds,
    /// Sale that triggered this row, if any
    pub order: Option<OrderId>,
}

impl LedgerEntry {
    pub fn is_credit(&self) -> bool {
        self.direction == Direction::Credit
    }

    /// Signed contribution of this row to a balance
    pub fn signed_amount(&self) -> i128 {
        match self.direction {
            Direction::Credit => self.amount as i128,
            Direction::Debit => -(self.amount as i128),
        }
    }
}

/// Sum of ledger rows; negative only if the ledger itself is corrupted
pub fn ledger_sum<'a, I: IntoIterator<Item = &'a LedgerEntry>>(entries: I) -> i128 {
    entries.into_iter().map(LedgerEntry::signed_amount).sum()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatementLine {
    pub entry: LedgerEntry,
    pub running_balance: Amount,
}

/// Ordered wallet rows with their running balance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletStatement {
    pub participant: ParticipantId,
    pub lines: Vec<StatementLine>,
    pub closing_balance: Amount,
}

/// Administrative balance correction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    pub participant: ParticipantId,
    pub amount: Amount,
    pub direction: Direction,
    pub note: String,
    pub timestamp: TimestampSeconds,
}

/// Comparison between cached balances and ledger sums
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reconciliation {
    pub participant: ParticipantId,
    pub cached_commission: Amount,
    pub ledger_commission: i128,
    pub cached_wallet: Amount,
    pub ledger_wallet: i128,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.cached_commission as i128 == self.ledger_commission
            && self.cached_wallet as i128 == self.ledger_wallet
    }
}
