use log::{debug, warn};
use mlm_common::{
    amount::{apply_bps, format_amount, Amount},
    ledger::CommissionReason,
    participant::{Participant, Position},
    sale::CascadeReport,
    time::day_of,
};

use super::SaleContext;
use crate::core::{
    error::EngineError,
    ledger::{binary_commission_on_day, credit, credit_participant, has_reason},
    rank::{get_daily_commission_cap, refresh_rank},
    storage::Storage,
};

/// Leg volume, binary pairing and one-time bonuses of one tree ancestor.
///
/// The ancestor record is updated in place and stored by the caller.
pub async fn process_ancestor<S: Storage>(
    storage: &mut S,
    ctx: &SaleContext<'_>,
    ancestor: &mut Participant,
    leg: Position,
    report: &mut CascadeReport,
) -> Result<(), EngineError> {
    let plan = ctx.plan;
    let volume = ancestor.leg_volume_mut(leg);
    *volume = volume.saturating_add(ctx.sale.amount);
    refresh_rank(&*storage, plan, ancestor).await?;

    let day = day_of(ctx.sale.timestamp);
    let cap = get_daily_commission_cap(plan, ancestor.rank);

    let earned_today = binary_commission_on_day(&*storage, ancestor.id, day).await?;
    let capped = earned_today > 0 && earned_today >= cap;
    if capped {
        warn!(
            "{} already reached its daily cap of {}, legs are reset",
            ancestor.id,
            format_amount(cap)
        );
        ancestor.reset_leg_volumes();
    } else {
        let commission = pair_legs(ctx, ancestor);
        if let Some(distribution) = credit_participant(
            storage,
            ancestor,
            ctx.posting(commission, CommissionReason::BinaryCommission),
        )
        .await?
        {
            report.push(distribution);
            pay_matching_bonus(storage, ctx, ancestor, commission, report).await?;
        }
    }

    pay_leadership_bonus(storage, ctx, ancestor, report).await?;
    pay_rank_achievement_bonus(storage, ctx, ancestor, report).await?;

    let earned_today = binary_commission_on_day(&*storage, ancestor.id, day).await?;
    if earned_today >= cap && (ancestor.left_leg_volume > 0 || ancestor.right_leg_volume > 0) {
        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "{} earned {} today, cap {} reached, legs are reset",
                ancestor.id,
                format_amount(earned_today),
                format_amount(cap)
            );
        }
        ancestor.reset_leg_volumes();
    }
    Ok(())
}

/// Consume whole pairs from both legs, returning the commission they earn
fn pair_legs(ctx: &SaleContext<'_>, ancestor: &mut Participant) -> Amount {
    let binary = &ctx.plan.binary;
    let pair_volume = ancestor.left_leg_volume.min(ancestor.right_leg_volume);
    if pair_volume < binary.pair_unit {
        return 0;
    }

    let pairs = pair_volume / binary.pair_unit;
    let consumed = pairs * binary.pair_unit;
    ancestor.left_leg_volume -= consumed;
    ancestor.right_leg_volume -= consumed;

    if log::log_enabled!(log::Level::Debug) {
        debug!("{} matched {} pairs", ancestor.id, pairs);
    }
    pairs.saturating_mul(binary.pair_commission)
}

async fn pay_matching_bonus<S: Storage>(
    storage: &mut S,
    ctx: &SaleContext<'_>,
    ancestor: &Participant,
    commission: Amount,
    report: &mut CascadeReport,
) -> Result<(), EngineError> {
    let Some(sponsor) = ancestor.sponsor else {
        return Ok(());
    };
    let amount = apply_bps(commission, ctx.plan.binary.matching_bps);
    if let Some(distribution) =
        credit(storage, sponsor, ctx.posting(amount, CommissionReason::MatchingBonus)).await?
    {
        report.push(distribution);
    }
    Ok(())
}

async fn pay_leadership_bonus<S: Storage>(
    storage: &mut S,
    ctx: &SaleContext<'_>,
    ancestor: &mut Participant,
    report: &mut CascadeReport,
) -> Result<(), EngineError> {
    let leadership = &ctx.plan.leadership;
    if ancestor.rank < leadership.min_rank {
        return Ok(());
    }
    if has_reason(&*storage, ancestor.id, CommissionReason::LeadershipBonus).await? {
        ancestor.leadership_bonus_given = true;
        return Ok(());
    }

    let posting = ctx.posting(leadership.bonus, CommissionReason::LeadershipBonus);
    if let Some(distribution) = credit_participant(storage, ancestor, posting).await? {
        report.push(distribution);
    }
    ancestor.leadership_bonus_given = true;
    Ok(())
}

async fn pay_rank_achievement_bonus<S: Storage>(
    storage: &mut S,
    ctx: &SaleContext<'_>,
    ancestor: &mut Participant,
    report: &mut CascadeReport,
) -> Result<(), EngineError> {
    let rank = ancestor.rank;
    if rank <= ancestor.last_rank_awarded {
        return Ok(());
    }
    let Some(bonus) = ctx.plan.achievement_bonus(rank) else {
        return Ok(());
    };

    let reason = CommissionReason::RankAchievementBonus(rank);
    if !has_reason(&*storage, ancestor.id, reason).await? {
        if let Some(distribution) =
            credit_participant(storage, ancestor, ctx.posting(bonus, reason)).await?
        {
            report.push(distribution);
        }
    }
    ancestor.rank_bonus_given = true;
    ancestor.last_rank_awarded = rank;
    Ok(())
}
