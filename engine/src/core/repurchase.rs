use log::debug;
use mlm_common::{amount::apply_bps, ledger::CommissionReason, sale::CascadeReport};

use super::{
    cascade::SaleContext,
    error::EngineError,
    ledger::credit,
    rank::get_allowed_repurchase_levels,
    storage::Storage,
    walk::sponsor_chain,
};

/// Point based cascade of a repeat purchase.
///
/// Level 0 is the purchaser, level n its n-th sponsor. Each participant is
/// gated by its own rank: it is paid at level n only if n is below the number
/// of repurchase levels its rank allows.
pub async fn distribute_repurchase<S: Storage>(
    storage: &mut S,
    ctx: &SaleContext<'_>,
    report: &mut CascadeReport,
) -> Result<(), EngineError> {
    let ladder = &ctx.plan.repurchase.level_bps;
    if ladder.is_empty() || ctx.sale.point_base == 0 {
        return Ok(());
    }

    let buyer = ctx.sale.buyer;
    let mut levels = vec![buyer];
    levels.extend(sponsor_chain(&*storage, buyer, ladder.len() - 1, ctx.limit).await?);

    for (level, (participant, bps)) in levels.into_iter().zip(ladder.iter()).enumerate() {
        let rank = storage.get_participant(participant).await?.rank;
        let allowed = get_allowed_repurchase_levels(ctx.plan, rank) as usize;
        if level >= allowed {
            if log::log_enabled!(log::Level::Debug) {
                debug!(
                    "{} at level {} is not eligible with rank {}",
                    participant, level, rank
                );
            }
            continue;
        }

        let level = u8::try_from(level).map_err(|_| {
            EngineError::InternalInconsistency(format!("repurchase level {} out of range", level))
        })?;
        let reason = CommissionReason::RepurchaseCommission(level);
        let amount = apply_bps(ctx.sale.point_base, *bps);
        let posting = ctx.posting(amount, reason);
        if let Some(distribution) = credit(storage, participant, posting).await? {
            report.push(distribution);
        }
    }
    Ok(())
}
