use std::collections::{HashMap, HashSet, VecDeque};

use log::{error, info, warn};
use mlm_common::{
    amount::Amount,
    ledger::{Adjustment, LedgerEntry, Reconciliation, WalletStatement},
    milestone::{Fund, FundContribution, RewardPayout, TeamSalesProgress},
    participant::{Participant, ParticipantId, ParticipantSummary, Registration, TreeNode},
    plan::CompensationPlan,
    sale::{CascadeReport, SaleEvent},
    time::TimestampSeconds,
};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    config::EngineConfig,
    core::{cascade, error::EngineError, ledger, placement, rank, storage::Storage, walk::WalkLimit},
};

/// Entry point of the external collaborators.
///
/// Every mutating operation holds the write lock for its whole duration and
/// runs inside one storage snapshot: it is either applied entirely or not at
/// all. Queries share the read lock.
pub struct Engine<S: Storage> {
    storage: RwLock<S>,
    plan: CompensationPlan,
    config: EngineConfig,
}

impl<S: Storage> Engine<S> {
    pub fn new(
        storage: S,
        plan: CompensationPlan,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        plan.validate()?;
        info!(
            "compensation plan v{} loaded: {} ranks, {} milestones",
            plan.version,
            plan.rank_bands.len(),
            plan.milestones.len()
        );
        Ok(Self {
            storage: RwLock::new(storage),
            plan,
            config,
        })
    }

    pub fn plan(&self) -> &CompensationPlan {
        &self.plan
    }

    pub async fn storage(&self) -> RwLockReadGuard<'_, S> {
        self.storage.read().await
    }

    /// Direct access to the storage, bypassing every engine rule
    pub async fn storage_mut(&self) -> RwLockWriteGuard<'_, S> {
        self.storage.write().await
    }

    async fn begin(&self) -> Result<(RwLockWriteGuard<'_, S>, WalkLimit), EngineError> {
        let mut storage = self.storage.write().await;
        storage.start_snapshot().await?;
        match WalkLimit::new(&*storage, self.config.max_walk_depth).await {
            Ok(limit) => Ok((storage, limit)),
            Err(e) => {
                storage.end_snapshot(false).await?;
                Err(e)
            }
        }
    }

    /// Commit the snapshot on success, discard it otherwise
    async fn finish<T>(
        storage: &mut S,
        operation: &str,
        result: Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        match result {
            Ok(value) => {
                storage.end_snapshot(true).await?;
                Ok(value)
            }
            Err(e) => {
                if e.is_validation() {
                    warn!("{} refused: {}", operation, e);
                } else {
                    error!("{} rolled back: {}", operation, e);
                }
                storage.end_snapshot(false).await?;
                Err(e)
            }
        }
    }

    pub async fn register_root(
        &self,
        id: ParticipantId,
        name: String,
        timestamp: TimestampSeconds,
    ) -> Result<Participant, EngineError> {
        let (mut storage, _) = self.begin().await?;
        let result = placement::register_root(&mut *storage, id, name, timestamp).await;
        Self::finish(&mut storage, "root registration", result).await
    }

    pub async fn on_distributor_signup(
        &self,
        registration: Registration,
    ) -> Result<Participant, EngineError> {
        let (mut storage, limit) = self.begin().await?;
        let result = placement::attach(&mut *storage, registration, limit).await;
        Self::finish(&mut storage, "signup", result).await
    }

    pub async fn on_parent_change_request(
        &self,
        child: ParticipantId,
        new_parent: ParticipantId,
    ) -> Result<Participant, EngineError> {
        let (mut storage, limit) = self.begin().await?;
        let result = placement::move_participant(&mut *storage, child, new_parent, limit).await;
        Self::finish(&mut storage, "parent change", result).await
    }

    /// Run the commission cascade of an approved sale.
    ///
    /// A second approval of the same order fails with `DuplicateSale`.
    pub async fn on_sale_approved(&self, sale: SaleEvent) -> Result<CascadeReport, EngineError> {
        let (mut storage, limit) = self.begin().await?;
        let result = cascade::process_sale(&mut *storage, &self.plan, &sale, limit).await;
        Self::finish(&mut storage, "sale cascade", result).await
    }

    /// Returns the participants in processing order
    pub async fn recompute_all_ranks(&self) -> Result<Vec<ParticipantId>, EngineError> {
        let (mut storage, _) = self.begin().await?;
        let result = rank::recompute_all_ranks_bottom_up(&mut *storage, &self.plan).await;
        Self::finish(&mut storage, "rank recomputation", result).await
    }

    pub async fn manual_adjustment(
        &self,
        adjustment: Adjustment,
    ) -> Result<LedgerEntry, EngineError> {
        let (mut storage, _) = self.begin().await?;
        let result = ledger::manual_adjustment(&mut *storage, adjustment).await;
        Self::finish(&mut storage, "manual adjustment", result).await
    }

    pub async fn withdraw(
        &self,
        participant: ParticipantId,
        amount: Amount,
        timestamp: TimestampSeconds,
    ) -> Result<LedgerEntry, EngineError> {
        let (mut storage, _) = self.begin().await?;
        let result = ledger::withdraw(&mut *storage, participant, amount, timestamp).await;
        Self::finish(&mut storage, "withdrawal", result).await
    }

    pub async fn remove_participant(&self, id: ParticipantId) -> Result<Participant, EngineError> {
        let (mut storage, _) = self.begin().await?;
        let result = placement::remove_participant(&mut *storage, id).await;
        Self::finish(&mut storage, "removal", result).await
    }

    pub async fn get_participant(&self, id: ParticipantId) -> Result<Participant, EngineError> {
        self.storage.read().await.get_participant(id).await
    }

    pub async fn get_participant_summary(
        &self,
        id: ParticipantId,
    ) -> Result<ParticipantSummary, EngineError> {
        let participant = self.get_participant(id).await?;
        Ok(ParticipantSummary::from(&participant))
    }

    pub async fn get_wallet_statement(
        &self,
        id: ParticipantId,
    ) -> Result<WalletStatement, EngineError> {
        let storage = self.storage.read().await;
        ledger::wallet_statement(&*storage, id).await
    }

    pub async fn get_commission_entries(
        &self,
        id: ParticipantId,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        let storage = self.storage.read().await;
        storage.get_participant(id).await?;
        storage.get_commission_entries(id).await
    }

    pub async fn get_team_sales_progress(
        &self,
        id: ParticipantId,
    ) -> Result<TeamSalesProgress, EngineError> {
        let storage = self.storage.read().await;
        storage.get_participant(id).await?;
        Ok(storage
            .get_team_sales_progress(id)
            .await?
            .unwrap_or_else(|| TeamSalesProgress::new(id)))
    }

    pub async fn get_reward_payouts(
        &self,
        id: ParticipantId,
    ) -> Result<Vec<RewardPayout>, EngineError> {
        let storage = self.storage.read().await;
        storage.get_participant(id).await?;
        storage.get_reward_payouts(id).await
    }

    pub async fn get_fund_contributions(
        &self,
        fund: Fund,
    ) -> Result<Vec<FundContribution>, EngineError> {
        self.storage.read().await.get_fund_contributions(fund).await
    }

    /// Tree rooted at `id`, at most `depth` levels below it
    pub async fn get_tree(&self, id: ParticipantId, depth: usize) -> Result<TreeNode, EngineError> {
        let depth = depth.min(self.config.max_tree_query_depth);
        let storage = self.storage.read().await;

        let mut records: HashMap<ParticipantId, Participant> = HashMap::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back((id, 0usize));
        seen.insert(id);

        while let Some((current, level)) = queue.pop_front() {
            let participant = storage.get_participant(current).await?;
            if level < depth {
                for child in participant.children() {
                    if !seen.insert(child) {
                        return Err(EngineError::InternalInconsistency(format!(
                            "{} appears twice under {}",
                            child, id
                        )));
                    }
                    queue.push_back((child, level + 1));
                }
            }
            records.insert(current, participant);
        }

        build_tree(id, &records).ok_or(EngineError::NotFound(id))
    }

    pub async fn reconcile(&self, id: ParticipantId) -> Result<Reconciliation, EngineError> {
        let storage = self.storage.read().await;
        ledger::reconcile(&*storage, id).await
    }

    pub async fn audit_all(&self) -> Result<Vec<Reconciliation>, EngineError> {
        let storage = self.storage.read().await;
        ledger::audit_all(&*storage).await
    }

    pub async fn flush(&self) -> Result<(), EngineError> {
        self.storage.read().await.flush().await
    }
}

// Children that were not loaded (below the depth limit) are left out
fn build_tree(
    id: ParticipantId,
    records: &HashMap<ParticipantId, Participant>,
) -> Option<TreeNode> {
    let participant = records.get(&id)?;
    let mut node = TreeNode::leaf(participant);
    node.children = participant
        .children()
        .filter_map(|child| build_tree(child, records))
        .collect();
    Some(node)
}
