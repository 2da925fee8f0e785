use bytes::Bytes;
use log::{debug, trace};

use super::{Backend, WriteBatch};
use crate::{config::StorageConfig, core::error::EngineError};

/// Persistent backend: a single sled tree with column-prefixed keys,
/// so that a whole snapshot commits through one atomic `sled::Batch`.
pub struct SledBackend {
    db: sled::Db,
}

impl SledBackend {
    pub fn open(config: &StorageConfig) -> Result<Self, EngineError> {
        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "opening sled database at {} (cache: {} bytes)",
                config.db_path.display(),
                config.cache_capacity
            );
        }
        let db = sled::Config::new()
            .path(&config.db_path)
            .cache_capacity(config.cache_capacity)
            .open()?;
        Ok(Self { db })
    }
}

impl Backend for SledBackend {
    fn read(&self, key: &[u8]) -> Result<Option<Bytes>, EngineError> {
        Ok(self.db.get(key)?.map(|v| Bytes::copy_from_slice(&v)))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Bytes, Bytes)>, EngineError> {
        let mut entries = Vec::new();
        for res in self.db.scan_prefix(prefix) {
            let (k, v) = res?;
            entries.push((Bytes::copy_from_slice(&k), Bytes::copy_from_slice(&v)));
        }
        Ok(entries)
    }

    fn apply(&mut self, batch: WriteBatch) -> Result<(), EngineError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("applying batch of {} writes", batch.len());
        }
        let mut sled_batch = sled::Batch::default();
        for (key, value) in batch {
            match value {
                Some(value) => sled_batch.insert(key, value.as_ref()),
                None => sled_batch.remove(key),
            }
        }
        self.db.apply_batch(sled_batch)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), EngineError> {
        self.db.flush()?;
        Ok(())
    }
}
