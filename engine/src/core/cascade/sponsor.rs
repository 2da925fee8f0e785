use mlm_common::{amount::apply_bps, ledger::CommissionReason, sale::CascadeReport};

use super::SaleContext;
use crate::core::{error::EngineError, ledger::credit, storage::Storage, walk::sponsor_chain};

/// Direct bonus to the buyer's sponsor, then the indirect ladder up the
/// sponsor chain. Stops early when the chain ends.
pub async fn distribute_sponsor_bonuses<S: Storage>(
    storage: &mut S,
    ctx: &SaleContext<'_>,
    report: &mut CascadeReport,
) -> Result<(), EngineError> {
    let ladder = &ctx.plan.sponsor;
    let chain = sponsor_chain(
        &*storage,
        ctx.sale.buyer,
        1 + ladder.indirect_bps.len(),
        ctx.limit,
    )
    .await?;

    for (level, sponsor) in chain.into_iter().enumerate() {
        let (bps, reason) = match level {
            0 => (ladder.direct_bps, CommissionReason::DirectSponsorBonus),
            n => {
                let level = u8::try_from(n).map_err(|_| {
                    EngineError::InternalInconsistency(format!("sponsor level {} out of range", n))
                })?;
                (
                    ladder.indirect_bps[n - 1],
                    CommissionReason::IndirectSponsorBonus(level),
                )
            }
        };
        let amount = apply_bps(ctx.sale.amount, bps);
        if let Some(distribution) = credit(storage, sponsor, ctx.posting(amount, reason)).await? {
            report.push(distribution);
        }
    }
    Ok(())
}
