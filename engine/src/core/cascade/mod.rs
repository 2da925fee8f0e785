// Commission cascade of one approved sale
//
// Runs in a single snapshot opened by the engine: any error leaves the
// storage exactly as it was before the sale.

mod binary;
mod sponsor;

use log::{debug, info};
use mlm_common::{
    amount::{format_amount, Amount},
    ledger::CommissionReason,
    plan::CompensationPlan,
    sale::{CascadeReport, OrderRecord, SaleEvent},
};

use super::{
    error::EngineError,
    ledger::Posting,
    milestone, rank, repurchase,
    storage::Storage,
    walk::{tree_ancestors, WalkLimit},
};

/// Everything a cascade step needs to know about the sale being processed
pub struct SaleContext<'a> {
    pub plan: &'a CompensationPlan,
    pub sale: &'a SaleEvent,
    pub buyer_name: String,
    pub limit: WalkLimit,
}

impl SaleContext<'_> {
    /// Posting of a cascade credit, with a remark naming the buyer
    pub fn posting(&self, amount: Amount, reason: CommissionReason) -> Posting {
        Posting::new(
            amount,
            reason,
            format!("{} from {}", reason, self.buyer_name),
            self.sale.timestamp,
        )
        .for_order(self.sale.order_id)
    }
}

pub async fn process_sale<S: Storage>(
    storage: &mut S,
    plan: &CompensationPlan,
    sale: &SaleEvent,
    limit: WalkLimit,
) -> Result<CascadeReport, EngineError> {
    if storage.has_order(sale.order_id).await? {
        return Err(EngineError::DuplicateSale(sale.order_id));
    }
    let mut buyer = storage.get_participant(sale.buyer).await?;

    if log::log_enabled!(log::Level::Debug) {
        debug!(
            "processing order {} of {} by {} (repurchase: {})",
            sale.order_id,
            format_amount(sale.amount),
            buyer.id,
            sale.is_repurchase
        );
    }

    // recorded first so the lifetime purchases include this sale
    storage.add_order(&OrderRecord::from(sale)).await?;

    let ctx = SaleContext {
        plan,
        sale,
        buyer_name: buyer.name.clone(),
        limit,
    };
    let mut report = CascadeReport::new(sale.order_id);

    sponsor::distribute_sponsor_bonuses(storage, &ctx, &mut report).await?;

    buyer.total_points = buyer.total_points.saturating_add(sale.point_base);
    rank::refresh_rank(&*storage, plan, &mut buyer).await?;
    storage.set_participant(&buyer).await?;

    for step in tree_ancestors(&*storage, buyer.id, limit).await? {
        let mut ancestor = storage.get_participant(step.ancestor).await?;
        binary::process_ancestor(storage, &ctx, &mut ancestor, step.leg, &mut report).await?;
        milestone::process_milestones(storage, &ctx, &mut ancestor, step.leg, &mut report).await?;
        storage.set_participant(&ancestor).await?;
    }

    if sale.is_repurchase {
        repurchase::distribute_repurchase(storage, &ctx, &mut report).await?;
    }

    info!(
        "order {} by {} distributed {} in {} credits",
        sale.order_id,
        sale.buyer,
        format_amount(report.total_distributed),
        report.distributions.len()
    );
    Ok(report)
}
