use log::{debug, info};
use mlm_common::{
    amount::Amount,
    participant::{Participant, ParticipantId},
    plan::CompensationPlan,
    rank::Rank,
};

use super::{
    error::EngineError,
    storage::Storage,
    walk::{post_order, WalkLimit},
};

/// Rank earned by the participant's own lifetime purchases
pub async fn compute_rank_from_purchases<S: Storage>(
    storage: &S,
    plan: &CompensationPlan,
    participant: ParticipantId,
) -> Result<Rank, EngineError> {
    let total = storage.get_lifetime_purchases(participant).await?;
    Ok(plan.rank_for_purchases(total))
}

/// Raise the rank of the record to what its purchases earn.
/// Ranks are never lowered. Returns true if the rank changed.
pub async fn refresh_rank<S: Storage>(
    storage: &S,
    plan: &CompensationPlan,
    participant: &mut Participant,
) -> Result<bool, EngineError> {
    let computed = compute_rank_from_purchases(storage, plan, participant.id).await?;
    if computed > participant.rank {
        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "rank of {} goes from {} to {}",
                participant.id, participant.rank, computed
            );
        }
        participant.rank = computed;
        return Ok(true);
    }
    Ok(false)
}

/// Recompute every rank, one root at a time, children before their parent.
///
/// Returns the participants in the order they were processed.
pub async fn recompute_all_ranks_bottom_up<S: Storage>(
    storage: &mut S,
    plan: &CompensationPlan,
) -> Result<Vec<ParticipantId>, EngineError> {
    let limit = WalkLimit::whole_directory(&*storage).await?;
    let roots: Vec<ParticipantId> = storage
        .get_all_participants()
        .await?
        .into_iter()
        .filter(Participant::is_root)
        .map(|p| p.id)
        .collect();

    let mut visited = Vec::new();
    let mut changed = 0usize;
    for root in roots {
        for id in post_order(&*storage, root, limit).await? {
            let mut participant = storage.get_participant(id).await?;
            if refresh_rank(&*storage, plan, &mut participant).await? {
                storage.set_participant(&participant).await?;
                changed += 1;
            }
            visited.push(id);
        }
    }

    info!(
        "recomputed ranks of {} participants, {} changed",
        visited.len(),
        changed
    );
    Ok(visited)
}

pub fn get_daily_commission_cap(plan: &CompensationPlan, rank: Rank) -> Amount {
    plan.daily_cap(rank)
}

pub fn get_allowed_repurchase_levels(plan: &CompensationPlan, rank: Rank) -> u8 {
    plan.repurchase_levels(rank)
}
