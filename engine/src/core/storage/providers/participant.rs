use crate::core::{
    error::{DiskContext, EngineError},
    storage::{Backend, Column, KvStorage},
};
use async_trait::async_trait;
use log::trace;
use mlm_common::participant::{Participant, ParticipantId};

const PARTICIPANTS_COUNT: &[u8] = b"participants_count";
const REMOVED_PREFIX: &[u8] = b"removed_participant";

// Ledger rows and orders stay keyed by a removed id, so the id is never reused
fn removed_key(id: ParticipantId) -> Vec<u8> {
    let mut key = REMOVED_PREFIX.to_vec();
    key.extend_from_slice(&id.to_be_bytes());
    key
}

#[async_trait]
pub trait ParticipantProvider {
    async fn has_participant(&self, id: ParticipantId) -> Result<bool, EngineError>;

    /// Fails with `NotFound` if the participant is not registered
    async fn get_participant(&self, id: ParticipantId) -> Result<Participant, EngineError>;

    async fn get_optional_participant(
        &self,
        id: ParticipantId,
    ) -> Result<Option<Participant>, EngineError>;

    /// Insert or update a participant record
    async fn set_participant(&mut self, participant: &Participant) -> Result<(), EngineError>;

    /// Delete the record and retire its id
    async fn delete_participant(&mut self, id: ParticipantId) -> Result<(), EngineError>;

    /// Was this id registered once and then removed?
    async fn is_participant_removed(&self, id: ParticipantId) -> Result<bool, EngineError>;

    async fn count_participants(&self) -> Result<u64, EngineError>;

    /// Every participant, ordered by id
    async fn get_all_participants(&self) -> Result<Vec<Participant>, EngineError>;
}

#[async_trait]
impl<B: Backend> ParticipantProvider for KvStorage<B> {
    async fn has_participant(&self, id: ParticipantId) -> Result<bool, EngineError> {
        trace!("has participant {}", id);
        self.contains_data(Column::Participants, &id.to_be_bytes())
    }

    async fn get_participant(&self, id: ParticipantId) -> Result<Participant, EngineError> {
        self.get_optional_participant(id)
            .await?
            .ok_or(EngineError::NotFound(id))
    }

    async fn get_optional_participant(
        &self,
        id: ParticipantId,
    ) -> Result<Option<Participant>, EngineError> {
        trace!("get participant {}", id);
        self.load_optional_from_disk(Column::Participants, &id.to_be_bytes())
    }

    async fn set_participant(&mut self, participant: &Participant) -> Result<(), EngineError> {
        trace!("set participant {}", participant.id);
        let key = participant.id.to_be_bytes();
        if !self.contains_data(Column::Participants, &key)? {
            let count = self.count_participants().await?;
            self.insert_into_disk(Column::Common, PARTICIPANTS_COUNT, &(count + 1))?;
        }
        self.insert_into_disk(Column::Participants, &key, participant)
    }

    async fn delete_participant(&mut self, id: ParticipantId) -> Result<(), EngineError> {
        trace!("delete participant {}", id);
        let key = id.to_be_bytes();
        if !self.contains_data(Column::Participants, &key)? {
            return Err(EngineError::NotFound(id));
        }
        let count: u64 = self.load_from_disk(
            Column::Common,
            PARTICIPANTS_COUNT,
            DiskContext::ParticipantsCount,
        )?;
        self.insert_into_disk(Column::Common, PARTICIPANTS_COUNT, &count.saturating_sub(1))?;
        self.insert_into_disk(Column::Common, &removed_key(id), &true)?;
        self.remove_from_disk(Column::Participants, &key)
    }

    async fn is_participant_removed(&self, id: ParticipantId) -> Result<bool, EngineError> {
        trace!("is participant {} removed", id);
        self.contains_data(Column::Common, &removed_key(id))
    }

    async fn count_participants(&self) -> Result<u64, EngineError> {
        trace!("count participants");
        Ok(self
            .load_optional_from_disk(Column::Common, PARTICIPANTS_COUNT)?
            .unwrap_or(0))
    }

    async fn get_all_participants(&self) -> Result<Vec<Participant>, EngineError> {
        trace!("get all participants");
        self.scan_prefix(Column::Participants, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::MemoryStorage;

    #[tokio::test]
    async fn test_participant_count_tracks_inserts_and_deletes() {
        let mut storage = MemoryStorage::in_memory();
        let mut alice = Participant::new(1, "alice".into(), None, None, None, 0);
        storage.set_participant(&alice).await.unwrap();
        storage
            .set_participant(&Participant::new(2, "bob".into(), Some(1), Some(1), None, 0))
            .await
            .unwrap();
        assert_eq!(storage.count_participants().await.unwrap(), 2);

        // updating does not count twice
        alice.total_points = 10;
        storage.set_participant(&alice).await.unwrap();
        assert_eq!(storage.count_participants().await.unwrap(), 2);
        assert_eq!(storage.get_participant(1).await.unwrap().total_points, 10);

        storage.delete_participant(2).await.unwrap();
        assert_eq!(storage.count_participants().await.unwrap(), 1);
        assert!(matches!(
            storage.get_participant(2).await,
            Err(EngineError::NotFound(2))
        ));
        assert!(matches!(
            storage.delete_participant(2).await,
            Err(EngineError::NotFound(2))
        ));
        assert!(storage.is_participant_removed(2).await.unwrap());
        assert!(!storage.is_participant_removed(1).await.unwrap());

        let all = storage.get_all_participants().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, 1);
    }
}
