mod backend;
mod column;
mod providers;

pub mod snapshot;

pub use self::{backend::*, column::*, providers::*};

use crate::{
    config::StorageConfig,
    core::error::{DiskContext, EngineError},
};
use async_trait::async_trait;
use bytes::Bytes;
use log::trace;
use serde::{de::DeserializeOwned, Serialize};
use snapshot::{EntryState, Snapshot};

#[async_trait]
pub trait Storage:
    ParticipantProvider
    + LedgerProvider
    + OrderProvider
    + TeamSalesProvider
    + RewardProvider
    + SnapshotProvider
    + Sync
    + Send
    + 'static
{
    /// Make sure everything committed so far reached the disk
    async fn flush(&self) -> Result<(), EngineError>;
}

/// Typed storage over a byte-level backend.
///
/// While a snapshot is active, reads see the pending changes and writes are
/// buffered until `end_snapshot(true)`; `end_snapshot(false)` discards them.
pub struct KvStorage<B: Backend> {
    backend: B,
    snapshot: Option<Snapshot<Column>>,
}

pub type MemoryStorage = KvStorage<MemoryBackend>;
pub type SledStorage = KvStorage<SledBackend>;

impl MemoryStorage {
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl SledStorage {
    pub fn open(config: &StorageConfig) -> Result<Self, EngineError> {
        Ok(Self::new(SledBackend::open(config)?))
    }
}

impl<B: Backend> KvStorage<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            snapshot: None,
        }
    }

    fn read_raw(&self, column: Column, key: &[u8]) -> Result<Option<Bytes>, EngineError> {
        if let Some(snapshot) = self.snapshot.as_ref() {
            match snapshot.get(column, key) {
                EntryState::Stored(value) => return Ok(Some(value.clone())),
                EntryState::Deleted => return Ok(None),
                EntryState::Absent => {}
            }
        }
        self.backend.read(&column.key(key))
    }

    fn write_raw(
        &mut self,
        column: Column,
        key: &[u8],
        value: Option<Bytes>,
    ) -> Result<(), EngineError> {
        match self.snapshot.as_mut() {
            Some(snapshot) => {
                let key = Bytes::copy_from_slice(key);
                match value {
                    Some(value) => snapshot.insert(column, key, value),
                    None => snapshot.delete(column, key),
                };
                Ok(())
            }
            None => self.backend.apply(vec![(column.key(key), value)]),
        }
    }

    pub(crate) fn load_optional_from_disk<T: DeserializeOwned>(
        &self,
        column: Column,
        key: &[u8],
    ) -> Result<Option<T>, EngineError> {
        match self.read_raw(column, key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn load_from_disk<T: DeserializeOwned>(
        &self,
        column: Column,
        key: &[u8],
        context: DiskContext,
    ) -> Result<T, EngineError> {
        self.load_optional_from_disk(column, key)?
            .ok_or(EngineError::Disk(context))
    }

    pub(crate) fn contains_data(&self, column: Column, key: &[u8]) -> Result<bool, EngineError> {
        Ok(self.read_raw(column, key)?.is_some())
    }

    pub(crate) fn insert_into_disk<T: Serialize>(
        &mut self,
        column: Column,
        key: &[u8],
        value: &T,
    ) -> Result<(), EngineError> {
        let bytes = bincode::serialize(value)?;
        self.write_raw(column, key, Some(Bytes::from(bytes)))
    }

    pub(crate) fn remove_from_disk(
        &mut self,
        column: Column,
        key: &[u8],
    ) -> Result<(), EngineError> {
        self.write_raw(column, key, None)
    }

    /// All values whose key starts with `prefix`, in key order
    pub(crate) fn scan_prefix<T: DeserializeOwned>(
        &self,
        column: Column,
        prefix: &[u8],
    ) -> Result<Vec<T>, EngineError> {
        let column_prefix = column.key(prefix);
        let disk: Vec<(Bytes, Bytes)> = self
            .backend
            .scan_prefix(&column_prefix)?
            .into_iter()
            // strip the column byte so keys match the snapshot ones
            .map(|(k, v)| (k.slice(1..), v))
            .collect();

        let entries = match self.snapshot.as_ref() {
            Some(snapshot) => snapshot.overlay_prefix(column, prefix, disk),
            None => disk,
        };

        entries
            .into_iter()
            .map(|(_, v)| bincode::deserialize(&v).map_err(EngineError::from))
            .collect()
    }

    /// Read a counter and store its incremented value, returning the previous one
    pub(crate) fn next_counter(&mut self, key: &[u8]) -> Result<u64, EngineError> {
        let current: u64 = self
            .load_optional_from_disk(Column::Common, key)?
            .unwrap_or(0);
        self.insert_into_disk(Column::Common, key, &(current + 1))?;
        Ok(current)
    }

    fn commit_snapshot(&mut self, snapshot: Snapshot<Column>) -> Result<(), EngineError> {
        let mut batch = Vec::new();
        for (column, changes) in snapshot.into_parts() {
            for (key, value) in changes {
                batch.push((column.key(&key), value));
            }
        }
        if log::log_enabled!(log::Level::Trace) {
            trace!("committing snapshot with {} writes", batch.len());
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.backend.apply(batch)
    }
}

#[async_trait]
impl<B: Backend> Storage for KvStorage<B> {
    async fn flush(&self) -> Result<(), EngineError> {
        self.backend.flush()
    }
}

#[async_trait]
impl<B: Backend> SnapshotProvider for KvStorage<B> {
    async fn has_snapshot(&self) -> Result<bool, EngineError> {
        Ok(self.snapshot.is_some())
    }

    async fn start_snapshot(&mut self) -> Result<(), EngineError> {
        if self.snapshot.is_some() {
            return Err(EngineError::SnapshotAlreadyStarted);
        }
        trace!("starting snapshot");
        self.snapshot = Some(Snapshot::default());
        Ok(())
    }

    async fn end_snapshot(&mut self, apply: bool) -> Result<(), EngineError> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or(EngineError::SnapshotNotStarted)?;
        if apply {
            self.commit_snapshot(snapshot)
        } else {
            if log::log_enabled!(log::Level::Trace) {
                trace!("discarding snapshot");
            }
            Ok(())
        }
    }
}
