use strum::{AsRefStr, Display, EnumIter};

pub const PREFIX_ID_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash, EnumIter, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Column {
    // Tree nodes with their cached balances
    // {participant_id} => {participant}
    Participants,

    // Commission ledger, ordered by posting sequence per participant
    // {participant_id}{entry_id} => {ledger_entry}
    Commissions,
    // Wallet ledger
    // {participant_id}{entry_id} => {ledger_entry}
    Wallet,

    // Every approved sale
    // {order_id} => {order}
    Orders,
    // Reverse index used for lifetime purchases
    // {buyer_id}{order_id} => {order}
    OrdersByBuyer,

    // Cumulative matched-volume trackers
    // {participant_id} => {team_sales_progress}
    TeamSales,
    // One row per crossed milestone
    // {participant_id}{milestone_amount} => {reward_payout}
    RewardPayouts,
    // {fund_id}{contribution_id} => {fund_contribution}
    FundContributions,

    // Misc data with no specific rules (counters)
    Common,
}

impl Column {
    /// Single byte prefix of this column in a flat key space
    pub fn prefix(&self) -> u8 {
        match self {
            Self::Participants => 0,
            Self::Commissions => 1,
            Self::Wallet => 2,
            Self::Orders => 3,
            Self::OrdersByBuyer => 4,
            Self::TeamSales => 5,
            Self::RewardPayouts => 6,
            Self::FundContributions => 7,
            Self::Common => 8,
        }
    }

    /// Prefix the key with this column's byte
    pub fn key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(1 + key.len());
        full.push(self.prefix());
        full.extend_from_slice(key);
        full
    }
}

/// Compose a key from two big-endian ids so prefix scans come back sorted
pub fn composite_key(first: u64, second: u64) -> [u8; PREFIX_ID_LEN * 2] {
    let mut key = [0u8; PREFIX_ID_LEN * 2];
    key[..PREFIX_ID_LEN].copy_from_slice(&first.to_be_bytes());
    key[PREFIX_ID_LEN..].copy_from_slice(&second.to_be_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn test_prefixes_are_unique() {
        let prefixes: HashSet<u8> = Column::iter().map(|c| c.prefix()).collect();
        assert_eq!(prefixes.len(), Column::iter().count());
    }

    #[test]
    fn test_composite_key_ordering() {
        assert!(composite_key(1, 255) < composite_key(1, 256));
        assert!(composite_key(1, u64::MAX) < composite_key(2, 0));
        assert_eq!(&Column::Wallet.key(&[9])[..], &[2, 9]);
    }
}
