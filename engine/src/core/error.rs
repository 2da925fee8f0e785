use mlm_common::{
    amount::Amount, participant::ParticipantId, plan::PlanError, sale::OrderId,
};
use strum::Display;
use thiserror::Error;

/// Mandatory key that was expected on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DiskContext {
    Participant(ParticipantId),
    LedgerSequence,
    FundSequence,
    ParticipantsCount,
}

/// Why a tree placement was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PlacementFault {
    /// Parent already has a Left and a Right child
    SlotsFull,
    /// New parent is the participant itself or one of its descendants
    Cycle,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Participant {0} not found")]
    NotFound(ParticipantId),

    #[error("Participant {0} is already registered")]
    AlreadyRegistered(ParticipantId),

    #[error("Invalid placement under {parent}: {fault}")]
    PlacementInvalid {
        parent: ParticipantId,
        fault: PlacementFault,
    },

    #[error("Sponsor {sponsor} is not an upline of parent {parent}")]
    PlacementUnauthorized {
        sponsor: ParticipantId,
        parent: ParticipantId,
    },

    #[error("Insufficient funds for {participant}: need {needed}, have {available}")]
    InsufficientFunds {
        participant: ParticipantId,
        needed: Amount,
        available: Amount,
    },

    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("Order {0} was already approved")]
    DuplicateSale(OrderId),

    #[error("Walk from {start} exceeded maximum depth of {max_depth}")]
    WalkDepthExceeded {
        start: ParticipantId,
        max_depth: usize,
    },

    #[error("Participant {0} still has children or sponsored participants")]
    ParticipantInUse(ParticipantId),

    #[error("Snapshot already started")]
    SnapshotAlreadyStarted,

    #[error("No snapshot to end")]
    SnapshotNotStarted,

    #[error("Missing data on disk: {0}")]
    Disk(DiskContext),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Sled(#[from] sled::Error),

    #[error(transparent)]
    Serialization(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Errors caused by the request itself rather than by the storage layer
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::AlreadyRegistered(_)
                | Self::PlacementInvalid { .. }
                | Self::PlacementUnauthorized { .. }
                | Self::InsufficientFunds { .. }
                | Self::DuplicateSale(_)
                | Self::ParticipantInUse(_)
        )
    }
}
