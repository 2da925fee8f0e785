use crate::core::error::EngineError;
use async_trait::async_trait;

/// Transactional boundary of the storage.
///
/// Only one snapshot can be active at a time. Every write made while it is
/// active is either committed in one atomic batch or dropped.
#[async_trait]
pub trait SnapshotProvider {
    async fn has_snapshot(&self) -> Result<bool, EngineError>;

    async fn start_snapshot(&mut self) -> Result<(), EngineError>;

    /// Commit the pending changes if `apply` is true, discard them otherwise
    async fn end_snapshot(&mut self, apply: bool) -> Result<(), EngineError>;
}
