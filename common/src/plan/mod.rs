// Compensation plan
//
// All compensation constants live here as an ordered, versioned set of tier
// records instead of literals inside the cascade. A plan is loaded from JSON
// (or taken from `CompensationPlan::default()`) and must pass `validate()`
// before an engine accepts it.

mod error;

pub use error::*;

use crate::{
    amount::{units, Amount, BasisPoints, BPS_DENOMINATOR},
    milestone::Fund,
    rank::Rank,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path};

pub const PLAN_VERSION: u32 = 1;

// Ladder levels are reported as u8
pub const MAX_LADDER_LEN: usize = u8::MAX as usize + 1;

/// `[min, max)` band of own lifetime purchases mapped to a rank
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankBand {
    pub rank: Rank,
    pub min: Amount,
    /// None = open-ended (last band only)
    pub max: Option<Amount>,
}

impl RankBand {
    pub fn contains(&self, value: Amount) -> bool {
        value >= self.min && self.max.map_or(true, |max| value < max)
    }
}

/// Per-rank limits and one-time bonuses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankRules {
    pub rank: Rank,
    /// Binary commission cap per UTC day
    pub daily_cap: Amount,
    /// Number of sponsor-chain levels this rank can still earn repurchase commission at
    pub repurchase_levels: u8,
    /// Paid once when the rank is first reached
    pub achievement_bonus: Option<Amount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SponsorBonusPlan {
    pub direct_bps: BasisPoints,
    /// index 0 = sponsor's sponsor
    pub indirect_bps: Vec<BasisPoints>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BinaryPlan {
    /// Volume consumed from each leg per pair
    pub pair_unit: Amount,
    pub pair_commission: Amount,
    /// Share of the binary commission paid to the earner's sponsor
    pub matching_bps: BasisPoints,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeadershipPlan {
    pub min_rank: Rank,
    pub bonus: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepurchasePlan {
    /// index = level, 0 being the purchaser
    pub level_bps: Vec<BasisPoints>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MilestoneTier {
    /// Matched team volume that triggers the reward
    pub amount: Amount,
    pub rank_label: String,
    pub reward: String,
    pub royalty_bps: Option<BasisPoints>,
    pub travel_bps: Option<BasisPoints>,
    pub car_bps: Option<BasisPoints>,
    pub house_bps: Option<BasisPoints>,
}

impl MilestoneTier {
    fn new(amount: u64, rank_label: &str, reward: &str) -> Self {
        Self {
            amount: units(amount),
            rank_label: rank_label.to_owned(),
            reward: reward.to_owned(),
            royalty_bps: None,
            travel_bps: None,
            car_bps: None,
            house_bps: None,
        }
    }

    fn with(
        mut self,
        royalty: Option<BasisPoints>,
        travel: Option<BasisPoints>,
        car: Option<BasisPoints>,
        house: Option<BasisPoints>,
    ) -> Self {
        self.royalty_bps = royalty;
        self.travel_bps = travel;
        self.car_bps = car;
        self.house_bps = house;
        self
    }

    pub fn fund_bps(&self, fund: Fund) -> Option<BasisPoints> {
        match fund {
            Fund::Travel => self.travel_bps,
            Fund::Car => self.car_bps,
            Fund::House => self.house_bps,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompensationPlan {
    pub version: u32,
    pub rank_bands: Vec<RankBand>,
    pub rank_rules: Vec<RankRules>,
    pub sponsor: SponsorBonusPlan,
    pub binary: BinaryPlan,
    pub leadership: LeadershipPlan,
    pub repurchase: RepurchasePlan,
    /// Ascending by amount
    pub milestones: Vec<MilestoneTier>,
}

impl Default for CompensationPlan {
    fn default() -> Self {
        let band = |rank, min, max: Option<u64>| RankBand {
            rank,
            min: units(min),
            max: max.map(units),
        };
        let rules = |rank, cap, levels, bonus: Option<u64>| RankRules {
            rank,
            daily_cap: units(cap),
            repurchase_levels: levels,
            achievement_bonus: bonus.map(units),
        };

        Self {
            version: PLAN_VERSION,
            rank_bands: vec![
                band(Rank::None, 0, Some(5_000)),
                band(Rank::Beginner, 5_000, Some(15_000)),
                band(Rank::Area, 15_000, Some(30_000)),
                band(Rank::Zonal, 30_000, Some(60_000)),
                band(Rank::Regional, 60_000, Some(100_000)),
                band(Rank::Nation, 100_000, None),
            ],
            rank_rules: vec![
                rules(Rank::None, 0, 0, None),
                rules(Rank::Beginner, 12_000, 3, None),
                rules(Rank::Area, 20_000, 4, Some(2_000)),
                rules(Rank::Zonal, 30_000, 5, Some(5_000)),
                rules(Rank::Regional, 45_000, 7, Some(10_000)),
                rules(Rank::Nation, 60_000, 11, Some(25_000)),
            ],
            sponsor: SponsorBonusPlan {
                direct_bps: 1000,
                indirect_bps: vec![500, 300, 200, 100, 100],
            },
            binary: BinaryPlan {
                pair_unit: units(5_000),
                pair_commission: units(600),
                matching_bps: 1000,
            },
            leadership: LeadershipPlan {
                min_rank: Rank::Zonal,
                bonus: units(5_000),
            },
            repurchase: RepurchasePlan {
                level_bps: vec![1000, 800, 600, 500, 400, 300, 200, 100, 100, 100, 100],
            },
            milestones: vec![
                MilestoneTier::new(100_000, "Executive", "Smart Watch"),
                MilestoneTier::new(250_000, "Senior Executive", "Mobile Phone")
                    .with(Some(100), None, None, None),
                MilestoneTier::new(500_000, "Manager", "Laptop")
                    .with(Some(100), Some(100), None, None),
                MilestoneTier::new(1_000_000, "Senior Manager", "Motorbike")
                    .with(Some(100), Some(200), None, None),
                MilestoneTier::new(2_000_000, "Director", "Domestic Tour")
                    .with(Some(150), Some(200), Some(100), None),
                MilestoneTier::new(3_000_000, "Senior Director", "International Tour")
                    .with(Some(150), Some(200), Some(200), None),
                MilestoneTier::new(5_000_000, "Vice President", "Car")
                    .with(Some(200), None, Some(300), None),
                MilestoneTier::new(7_500_000, "President", "Luxury Car")
                    .with(Some(200), None, Some(300), Some(200)),
                MilestoneTier::new(10_000_000, "Crown Ambassador", "House")
                    .with(Some(250), None, None, Some(500)),
            ],
        }
    }
}

fn check_ladder(ladder: &'static str, ratios: &[BasisPoints]) -> PlanResult<()> {
    if ratios.len() > MAX_LADDER_LEN {
        return Err(PlanError::LadderTooLong {
            ladder,
            len: ratios.len(),
        });
    }
    let total: u32 = ratios.iter().map(|&r| r as u32).sum();
    if total as u64 > BPS_DENOMINATOR {
        return Err(PlanError::RatiosTooHigh { ladder, total });
    }
    Ok(())
}

impl CompensationPlan {
    pub fn from_json_str(json: &str) -> PlanResult<Self> {
        let plan: Self =
            serde_json::from_str(json).map_err(|e| PlanError::Format(e.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> PlanResult<Self> {
        if log::log_enabled!(log::Level::Debug) {
            debug!("loading compensation plan from {}", path.as_ref().display());
        }
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| PlanError::Io(e.to_string()))?;
        Self::from_json_str(&content)
    }

    pub fn to_json_pretty(&self) -> PlanResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PlanError::Format(e.to_string()))
    }

    /// Check that bands are contiguous and exhaustive, every rank has rules,
    /// ladders stay below 100% and milestones are ascending.
    pub fn validate(&self) -> PlanResult<()> {
        let first = self.rank_bands.first().ok_or(PlanError::NoRankBands)?;
        if first.min != 0 {
            return Err(PlanError::BandsMustStartAtZero { start: first.min });
        }

        for (i, band) in self.rank_bands.iter().enumerate() {
            let next = self.rank_bands.get(i + 1);
            match (band.max, next) {
                (Some(max), Some(next)) => {
                    if max <= band.min {
                        return Err(PlanError::EmptyBand { rank: band.rank });
                    }
                    if max != next.min {
                        return Err(PlanError::BandsNotContiguous {
                            rank: band.rank,
                            end: max,
                            next_start: next.min,
                        });
                    }
                    if next.rank <= band.rank {
                        return Err(PlanError::RankOrder {
                            previous: band.rank,
                            rank: next.rank,
                        });
                    }
                }
                (Some(_), None) => return Err(PlanError::LastBandMustBeOpen { rank: band.rank }),
                (None, Some(_)) => return Err(PlanError::OpenBandNotLast { rank: band.rank }),
                (None, None) => {}
            }
        }

        let mut seen = HashSet::new();
        for rules in &self.rank_rules {
            if !seen.insert(rules.rank) {
                return Err(PlanError::DuplicateRankRules(rules.rank));
            }
        }
        for band in &self.rank_bands {
            if !seen.contains(&band.rank) {
                return Err(PlanError::MissingRankRules(band.rank));
            }
        }

        let mut sponsor = vec![self.sponsor.direct_bps];
        sponsor.extend_from_slice(&self.sponsor.indirect_bps);
        check_ladder("sponsor", &sponsor)?;
        check_ladder("repurchase", &self.repurchase.level_bps)?;
        check_ladder("matching", &[self.binary.matching_bps])?;

        if self.binary.pair_unit == 0 {
            return Err(PlanError::InvalidPairUnit);
        }

        for pair in self.milestones.windows(2) {
            if pair[1].amount <= pair[0].amount {
                return Err(PlanError::MilestonesNotAscending {
                    previous: pair[0].amount,
                    amount: pair[1].amount,
                });
            }
        }

        Ok(())
    }

    /// Rank earned by a lifetime purchase total
    pub fn rank_for_purchases(&self, total: Amount) -> Rank {
        self.rank_bands
            .iter()
            .find(|band| band.contains(total))
            .map(|band| band.rank)
            .unwrap_or_default()
    }

    pub fn rules(&self, rank: Rank) -> Option<&RankRules> {
        self.rank_rules.iter().find(|rules| rules.rank == rank)
    }

    pub fn daily_cap(&self, rank: Rank) -> Amount {
        self.rules(rank).map_or(0, |rules| rules.daily_cap)
    }

    pub fn repurchase_levels(&self, rank: Rank) -> u8 {
        self.rules(rank).map_or(0, |rules| rules.repurchase_levels)
    }

    pub fn achievement_bonus(&self, rank: Rank) -> Option<Amount> {
        self.rules(rank).and_then(|rules| rules.achievement_bonus)
    }

    /// Milestones in `(consumed, matched]`, ascending
    pub fn milestones_crossed(
        &self,
        consumed: Amount,
        matched: Amount,
    ) -> impl Iterator<Item = &MilestoneTier> {
        self.milestones
            .iter()
            .filter(move |tier| tier.amount > consumed && tier.amount <= matched)
    }
}
