// Compensation plan error types

use crate::{amount::Amount, rank::Rank};
use thiserror::Error;

/// Errors detected while loading or validating a compensation plan
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Plan has no rank bands")]
    NoRankBands,

    #[error("First rank band must start at 0, got {start}")]
    BandsMustStartAtZero { start: Amount },

    #[error("Rank band {rank} ends at {end} but the next band starts at {next_start}")]
    BandsNotContiguous {
        rank: Rank,
        end: Amount,
        next_start: Amount,
    },

    #[error("Rank band {rank} is empty or inverted")]
    EmptyBand { rank: Rank },

    #[error("Only the last rank band may be open-ended ({rank} is not the last)")]
    OpenBandNotLast { rank: Rank },

    #[error("Last rank band {rank} must be open-ended")]
    LastBandMustBeOpen { rank: Rank },

    #[error("Rank bands must be in strictly increasing rank order ({previous} before {rank})")]
    RankOrder { previous: Rank, rank: Rank },

    #[error("No rules configured for rank {0}")]
    MissingRankRules(Rank),

    #[error("Rules configured twice for rank {0}")]
    DuplicateRankRules(Rank),

    #[error("Total ratio of {ladder} ladder {total} exceeds 10000 (100%)")]
    RatiosTooHigh { ladder: &'static str, total: u32 },

    #[error("The {ladder} ladder has {len} levels, more than {}", super::MAX_LADDER_LEN)]
    LadderTooLong { ladder: &'static str, len: usize },

    #[error("Binary pair unit must be greater than 0")]
    InvalidPairUnit,

    #[error("Milestones must be strictly ascending ({previous} before {amount})")]
    MilestonesNotAscending { previous: Amount, amount: Amount },

    #[error("Invalid plan file: {0}")]
    Format(String),

    #[error("Unable to read plan file: {0}")]
    Io(String),
}

pub type PlanResult<T> = Result<T, PlanError>;
