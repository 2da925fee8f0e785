use crate::core::{
    error::EngineError,
    storage::{composite_key, Backend, Column, KvStorage},
};
use async_trait::async_trait;
use log::trace;
use mlm_common::{
    amount::Amount,
    milestone::{Fund, FundContribution, RewardPayout},
    participant::ParticipantId,
};

const FUND_SEQUENCE: &[u8] = b"fund_seq";

fn fund_prefix(fund: Fund) -> [u8; 1] {
    [fund.id()]
}

fn fund_key(fund: Fund, id: u64) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = fund.id();
    key[1..].copy_from_slice(&id.to_be_bytes());
    key
}

#[async_trait]
pub trait RewardProvider {
    async fn has_reward_payout(
        &self,
        participant: ParticipantId,
        milestone: Amount,
    ) -> Result<bool, EngineError>;

    /// Fails with `InternalInconsistency` if the milestone was already paid
    async fn add_reward_payout(&mut self, payout: &RewardPayout) -> Result<(), EngineError>;

    /// Payouts of a participant, by ascending milestone
    async fn get_reward_payouts(
        &self,
        participant: ParticipantId,
    ) -> Result<Vec<RewardPayout>, EngineError>;

    async fn next_contribution_id(&mut self) -> Result<u64, EngineError>;

    async fn add_fund_contribution(
        &mut self,
        contribution: &FundContribution,
    ) -> Result<(), EngineError>;

    async fn get_fund_contributions(
        &self,
        fund: Fund,
    ) -> Result<Vec<FundContribution>, EngineError>;
}

#[async_trait]
impl<B: Backend> RewardProvider for KvStorage<B> {
    async fn has_reward_payout(
        &self,
        participant: ParticipantId,
        milestone: Amount,
    ) -> Result<bool, EngineError> {
        trace!("has reward payout {} for {}", milestone, participant);
        self.contains_data(Column::RewardPayouts, &composite_key(participant, milestone))
    }

    async fn add_reward_payout(&mut self, payout: &RewardPayout) -> Result<(), EngineError> {
        trace!("add reward payout {} for {}", payout.milestone, payout.participant);
        let key = composite_key(payout.participant, payout.milestone);
        if self.contains_data(Column::RewardPayouts, &key)? {
            return Err(EngineError::InternalInconsistency(format!(
                "milestone {} already paid to {}",
                payout.milestone, payout.participant
            )));
        }
        self.insert_into_disk(Column::RewardPayouts, &key, payout)
    }

    async fn get_reward_payouts(
        &self,
        participant: ParticipantId,
    ) -> Result<Vec<RewardPayout>, EngineError> {
        trace!("get reward payouts of {}", participant);
        self.scan_prefix(Column::RewardPayouts, &participant.to_be_bytes())
    }

    async fn next_contribution_id(&mut self) -> Result<u64, EngineError> {
        self.next_counter(FUND_SEQUENCE)
    }

    async fn add_fund_contribution(
        &mut self,
        contribution: &FundContribution,
    ) -> Result<(), EngineError> {
        trace!(
            "add {} fund contribution {} from {}",
            contribution.fund,
            contribution.id,
            contribution.participant
        );
        self.insert_into_disk(
            Column::FundContributions,
            &fund_key(contribution.fund, contribution.id),
            contribution,
        )
    }

    async fn get_fund_contributions(
        &self,
        fund: Fund,
    ) -> Result<Vec<FundContribution>, EngineError> {
        trace!("get {} fund contributions", fund);
        self.scan_prefix(Column::FundContributions, &fund_prefix(fund))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStorage;

    fn payout(participant: ParticipantId, milestone: Amount) -> RewardPayout {
        RewardPayout {
            participant,
            milestone,
            rank_label: "Executive".into(),
            reward: "Smart Watch".into(),
            royalty_amount: 0,
            travel_amount: 0,
            car_amount: 0,
            house_amount: 0,
            timestamp: 0,
            order: None,
        }
    }

    #[tokio::test]
    async fn test_payout_is_unique_per_milestone() {
        let mut storage = MemoryStorage::in_memory();
        storage.add_reward_payout(&payout(1, 250)).await.unwrap();
        storage.add_reward_payout(&payout(1, 100)).await.unwrap();
        assert!(storage.has_reward_payout(1, 100).await.unwrap());
        assert!(!storage.has_reward_payout(2, 100).await.unwrap());
        assert!(storage.add_reward_payout(&payout(1, 100)).await.is_err());

        let milestones: Vec<Amount> = storage
            .get_reward_payouts(1)
            .await
            .unwrap()
            .iter()
            .map(|p| p.milestone)
            .collect();
        assert_eq!(milestones, vec![100, 250]);
    }

    #[tokio::test]
    async fn test_fund_contributions_are_split_by_fund() {
        let mut storage = MemoryStorage::in_memory();
        for fund in [Fund::Travel, Fund::Car, Fund::Travel] {
            let id = storage.next_contribution_id().await.unwrap();
            storage
                .add_fund_contribution(&FundContribution {
                    id,
                    fund,
                    participant: 1,
                    milestone: 500,
                    amount: 5,
                    timestamp: 0,
                })
                .await
                .unwrap();
        }
        let travel = storage.get_fund_contributions(Fund::Travel).await.unwrap();
        assert_eq!(travel.iter().map(|c| c.id).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(storage.get_fund_contributions(Fund::Car).await.unwrap().len(), 1);
        assert!(storage.get_fund_contributions(Fund::House).await.unwrap().is_empty());
    }
}
