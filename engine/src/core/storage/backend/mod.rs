// Byte-level key value backends
//
// Backends only know flat keys: the storage layer prefixes every key with its
// column byte. A batch must be applied atomically, all or nothing.

mod memory;
mod sled;

pub use self::{memory::MemoryBackend, sled::SledBackend};

use crate::core::error::EngineError;
use bytes::Bytes;

pub type WriteBatch = Vec<(Vec<u8>, Option<Bytes>)>;

pub trait Backend: Send + Sync + 'static {
    fn read(&self, key: &[u8]) -> Result<Option<Bytes>, EngineError>;

    /// Every entry whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Bytes, Bytes)>, EngineError>;

    /// Apply all writes (None = delete) in one atomic step
    fn apply(&mut self, batch: WriteBatch) -> Result<(), EngineError>;

    fn flush(&self) -> Result<(), EngineError>;
}
