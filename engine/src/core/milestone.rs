use log::{debug, info, warn};
use mlm_common::{
    amount::{apply_bps, Amount},
    ledger::CommissionReason,
    milestone::{Fund, FundContribution, RewardPayout, TeamSalesProgress},
    participant::{Participant, Position},
    plan::MilestoneTier,
    sale::CascadeReport,
};
use strum::IntoEnumIterator;

use super::{
    cascade::SaleContext, error::EngineError, ledger::credit_participant, storage::Storage,
};

fn share(tier: &MilestoneTier, bps: Option<u16>) -> Amount {
    bps.map_or(0, |bps| apply_bps(tier.amount, bps))
}

/// Accumulate team sales of one tree ancestor and pay the milestones its
/// matched volume crossed. Each milestone is paid once per participant.
pub async fn process_milestones<S: Storage>(
    storage: &mut S,
    ctx: &SaleContext<'_>,
    ancestor: &mut Participant,
    leg: Position,
    report: &mut CascadeReport,
) -> Result<(), EngineError> {
    let mut progress = storage
        .get_team_sales_progress(ancestor.id)
        .await?
        .unwrap_or_else(|| TeamSalesProgress::new(ancestor.id));
    progress.add_sales(leg, ctx.sale.amount);

    let matched = progress.matched_volume();
    for tier in ctx
        .plan
        .milestones_crossed(progress.matched_volume_consumed, matched)
    {
        if storage.has_reward_payout(ancestor.id, tier.amount).await? {
            warn!(
                "milestone {} of {} was already paid, skipping",
                tier.amount, ancestor.id
            );
            continue;
        }
        let payout = pay_milestone(storage, ctx, ancestor, tier, report).await?;
        report.reward_payouts.push(payout);
    }

    if matched > progress.matched_volume_consumed {
        progress.matched_volume_consumed = matched;
    }
    storage.set_team_sales_progress(&progress).await
}

async fn pay_milestone<S: Storage>(
    storage: &mut S,
    ctx: &SaleContext<'_>,
    ancestor: &mut Participant,
    tier: &MilestoneTier,
    report: &mut CascadeReport,
) -> Result<RewardPayout, EngineError> {
    let payout = RewardPayout {
        participant: ancestor.id,
        milestone: tier.amount,
        rank_label: tier.rank_label.clone(),
        reward: tier.reward.clone(),
        royalty_amount: share(tier, tier.royalty_bps),
        travel_amount: share(tier, tier.travel_bps),
        car_amount: share(tier, tier.car_bps),
        house_amount: share(tier, tier.house_bps),
        timestamp: ctx.sale.timestamp,
        order: Some(ctx.sale.order_id),
    };
    storage.add_reward_payout(&payout).await?;

    info!(
        "{} reached milestone {} ({}), reward: {}",
        ancestor.id, tier.amount, tier.rank_label, tier.reward
    );

    let royalty = ctx.posting(payout.royalty_amount, CommissionReason::RankRewardRoyalty);
    if let Some(distribution) = credit_participant(storage, ancestor, royalty).await? {
        report.push(distribution);
    }

    for fund in Fund::iter() {
        let amount = payout.fund_amount(fund);
        if amount == 0 {
            continue;
        }
        let id = storage.next_contribution_id().await?;
        storage
            .add_fund_contribution(&FundContribution {
                id,
                fund,
                participant: ancestor.id,
                milestone: tier.amount,
                amount,
                timestamp: ctx.sale.timestamp,
            })
            .await?;
        if log::log_enabled!(log::Level::Debug) {
            debug!("{} fund receives {} from {}", fund, amount, ancestor.id);
        }
    }

    Ok(payout)
}
