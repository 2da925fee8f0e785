use crate::core::{
    error::EngineError,
    storage::{composite_key, Backend, Column, KvStorage},
};
use async_trait::async_trait;
use log::trace;
use mlm_common::{
    ledger::{EntryId, LedgerEntry},
    participant::ParticipantId,
};

const LEDGER_SEQUENCE: &[u8] = b"ledger_seq";

/// Append-only commission and wallet ledgers.
///
/// Rows are keyed by `{participant}{entry_id}` so a participant's rows come
/// back in posting order. The entry id sequence is shared by both ledgers.
#[async_trait]
pub trait LedgerProvider {
    async fn next_entry_id(&mut self) -> Result<EntryId, EngineError>;

    /// Fails with `InternalInconsistency` if the row already exists
    async fn append_commission_entry(&mut self, entry: &LedgerEntry) -> Result<(), EngineError>;

    async fn append_wallet_entry(&mut self, entry: &LedgerEntry) -> Result<(), EngineError>;

    async fn get_commission_entries(
        &self,
        participant: ParticipantId,
    ) -> Result<Vec<LedgerEntry>, EngineError>;

    async fn get_wallet_entries(
        &self,
        participant: ParticipantId,
    ) -> Result<Vec<LedgerEntry>, EngineError>;
}

impl<B: Backend> KvStorage<B> {
    fn append_entry(&mut self, column: Column, entry: &LedgerEntry) -> Result<(), EngineError> {
        let key = composite_key(entry.participant, entry.id);
        if self.contains_data(column, &key)? {
            return Err(EngineError::InternalInconsistency(format!(
                "{} entry {} of {} already exists",
                column, entry.id, entry.participant
            )));
        }
        self.insert_into_disk(column, &key, entry)
    }
}

#[async_trait]
impl<B: Backend> LedgerProvider for KvStorage<B> {
    async fn next_entry_id(&mut self) -> Result<EntryId, EngineError> {
        self.next_counter(LEDGER_SEQUENCE)
    }

    async fn append_commission_entry(&mut self, entry: &LedgerEntry) -> Result<(), EngineError> {
        trace!("append commission entry {} for {}", entry.id, entry.participant);
        self.append_entry(Column::Commissions, entry)
    }

    async fn append_wallet_entry(&mut self, entry: &LedgerEntry) -> Result<(), EngineError> {
        trace!("append wallet entry {} for {}", entry.id, entry.participant);
        self.append_entry(Column::Wallet, entry)
    }

    async fn get_commission_entries(
        &self,
        participant: ParticipantId,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        trace!("get commission entries of {}", participant);
        self.scan_prefix(Column::Commissions, &participant.to_be_bytes())
    }

    async fn get_wallet_entries(
        &self,
        participant: ParticipantId,
    ) -> Result<Vec<LedgerEntry>, EngineError> {
        trace!("get wallet entries of {}", participant);
        self.scan_prefix(Column::Wallet, &participant.to_be_bytes())
    }
}
