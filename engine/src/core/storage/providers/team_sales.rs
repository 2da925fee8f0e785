use crate::core::{
    error::EngineError,
    storage::{Backend, Column, KvStorage},
};
use async_trait::async_trait;
use log::trace;
use mlm_common::{milestone::TeamSalesProgress, participant::ParticipantId};

#[async_trait]
pub trait TeamSalesProvider {
    /// None until the first sale reached this participant
    async fn get_team_sales_progress(
        &self,
        participant: ParticipantId,
    ) -> Result<Option<TeamSalesProgress>, EngineError>;

    async fn set_team_sales_progress(
        &mut self,
        progress: &TeamSalesProgress,
    ) -> Result<(), EngineError>;
}

#[async_trait]
impl<B: Backend> TeamSalesProvider for KvStorage<B> {
    async fn get_team_sales_progress(
        &self,
        participant: ParticipantId,
    ) -> Result<Option<TeamSalesProgress>, EngineError> {
        trace!("get team sales progress of {}", participant);
        self.load_optional_from_disk(Column::TeamSales, &participant.to_be_bytes())
    }

    async fn set_team_sales_progress(
        &mut self,
        progress: &TeamSalesProgress,
    ) -> Result<(), EngineError> {
        trace!("set team sales progress of {}", progress.participant);
        self.insert_into_disk(
            Column::TeamSales,
            &progress.participant.to_be_bytes(),
            progress,
        )
    }
}
