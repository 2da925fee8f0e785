use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Participant rank, ordered from lowest to highest.
///
/// Ranks drive the daily binary cap and how deep into the sponsor chain a
/// participant can still receive repurchase commissions.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Rank {
    #[default]
    None,
    Beginner,
    Area,
    Zonal,
    Regional,
    Nation,
}

impl Rank {
    /// Human readable label used in ledger remarks
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Beginner => "Beginner",
            Self::Area => "Area",
            Self::Zonal => "Zonal",
            Self::Regional => "Regional",
            Self::Nation => "Nation",
        }
    }
}
