// Participant records
//
// A participant is a node of the binary placement tree. It carries two
// independent upline edges: `parent` (placement, drives leg volumes and
// binary pairing) and `sponsor` (referral, drives sponsor and repurchase
// bonuses). The two must never be conflated.

use crate::{amount::Amount, rank::Rank, time::TimestampSeconds};
use serde::{Deserialize, Serialize};
use strum::Display;

pub type ParticipantId = u64;

/// Child slot under a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Position {
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,

    /// Display name, used in ledger remarks
    pub name: String,

    /// Placement parent (None = tree root)
    pub parent: Option<ParticipantId>,

    /// Referral sponsor (None = top-level)
    pub sponsor: Option<ParticipantId>,

    /// Slot occupied under `parent`
    pub position: Option<Position>,

    pub left_child: Option<ParticipantId>,
    pub right_child: Option<ParticipantId>,

    pub rank: Rank,

    /// Transient pairing volume, consumed by binary matching
    pub left_leg_volume: Amount,
    pub right_leg_volume: Amount,

    /// Cached projections of the commission and wallet ledgers
    pub commission_balance: Amount,
    pub total_wallet_balance: Amount,

    pub total_points: Amount,

    pub leadership_bonus_given: bool,
    pub rank_bonus_given: bool,
    pub last_rank_awarded: Rank,

    pub registered_at: TimestampSeconds,
}

impl Participant {
    /// Create a participant with empty balances
    pub fn new(
        id: ParticipantId,
        name: String,
        parent: Option<ParticipantId>,
        sponsor: Option<ParticipantId>,
        position: Option<Position>,
        registered_at: TimestampSeconds,
    ) -> Self {
        Self {
            id,
            name,
            parent,
            sponsor,
            position,
            left_child: None,
            right_child: None,
            rank: Rank::None,
            left_leg_volume: 0,
            right_leg_volume: 0,
            commission_balance: 0,
            total_wallet_balance: 0,
            total_points: 0,
            leadership_bonus_given: false,
            rank_bonus_given: false,
            last_rank_awarded: Rank::None,
            registered_at,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn child_at(&self, position: Position) -> Option<ParticipantId> {
        match position {
            Position::Left => self.left_child,
            Position::Right => self.right_child,
        }
    }

    /// First free slot, Left is filled before Right
    pub fn free_slot(&self) -> Option<Position> {
        if self.left_child.is_none() {
            Some(Position::Left)
        } else if self.right_child.is_none() {
            Some(Position::Right)
        } else {
            None
        }
    }

    pub fn set_child(&mut self, position: Position, child: Option<ParticipantId>) {
        match position {
            Position::Left => self.left_child = child,
            Position::Right => self.right_child = child,
        }
    }

    pub fn children(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.left_child.into_iter().chain(self.right_child)
    }

    pub fn has_children(&self) -> bool {
        self.left_child.is_some() || self.right_child.is_some()
    }

    pub fn leg_volume_mut(&mut self, position: Position) -> &mut Amount {
        match position {
            Position::Left => &mut self.left_leg_volume,
            Position::Right => &mut self.right_leg_volume,
        }
    }

    pub fn reset_leg_volumes(&mut self) {
        self.left_leg_volume = 0;
        self.right_leg_volume = 0;
    }
}

/// Signup request coming from the registration flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: ParticipantId,
    pub name: String,
    pub sponsor: ParticipantId,
    pub parent: ParticipantId,
    pub timestamp: TimestampSeconds,
}

/// Read model exposed to the reporting layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub name: String,
    pub rank: Rank,
    pub wallet_balance: Amount,
    pub commission_balance: Amount,
    pub left_leg_volume: Amount,
    pub right_leg_volume: Amount,
    pub total_points: Amount,
}

impl From<&Participant> for ParticipantSummary {
    fn from(participant: &Participant) -> Self {
        Self {
            id: participant.id,
            name: participant.name.clone(),
            rank: participant.rank,
            wallet_balance: participant.total_wallet_balance,
            commission_balance: participant.commission_balance,
            left_leg_volume: participant.left_leg_volume,
            right_leg_volume: participant.right_leg_volume,
            total_points: participant.total_points,
        }
    }
}

/// Recursive tree report rooted at a participant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeNode {
    pub id: ParticipantId,
    pub name: String,
    pub position: Option<Position>,
    pub rank: Rank,
    pub wallet_balance: Amount,
    pub commission_balance: Amount,
    pub left_leg_volume: Amount,
    pub right_leg_volume: Amount,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(participant: &Participant) -> Self {
        Self {
            id: participant.id,
            name: participant.name.clone(),
            position: participant.position,
            rank: participant.rank,
            wallet_balance: participant.total_wallet_balance,
            commission_balance: participant.commission_balance,
            left_leg_volume: participant.left_leg_volume,
            right_leg_volume: participant.right_leg_volume,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including itself
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_slot_fills_left_first() {
        let mut p = Participant::new(1, "root".into(), None, None, None, 0);
        assert_eq!(p.free_slot(), Some(Position::Left));
        p.set_child(Position::Left, Some(2));
        assert_eq!(p.free_slot(), Some(Position::Right));
        p.set_child(Position::Right, Some(3));
        assert_eq!(p.free_slot(), None);
        assert_eq!(p.children().collect::<Vec<_>>(), vec![2, 3]);

        // freeing the left slot makes it available again
        p.set_child(Position::Left, None);
        assert_eq!(p.free_slot(), Some(Position::Left));
    }

    #[test]
    fn test_leg_volume_access() {
        let mut p = Participant::new(1, "root".into(), None, None, None, 0);
        *p.leg_volume_mut(Position::Right) += 500;
        assert_eq!(p.right_leg_volume, 500);
        assert_eq!(p.left_leg_volume, 0);
        p.reset_leg_volumes();
        assert_eq!(p.right_leg_volume, 0);
    }
}
