mod discard;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use loadfarm_common::config::StoreKind;

pub use self::discard::DiscardStore;
pub use self::memory::MemoryStore;
use crate::error::StoreResult;

/// A backing store that accepts writes in atomically committed batches.
pub trait BatchSink: Send + Sync + 'static {
    fn open_batch(&self) -> Box<dyn WriteBatch>;
}

#[async_trait]
pub trait WriteBatch: Send {
    fn put(&mut self, row_key: Vec<u8>, column: &str, value: Vec<u8>);
    /// Applies every write of the batch, or none of them on failure.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

pub fn build_store(kind: &StoreKind) -> Arc<dyn BatchSink> {
    match kind {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::Discard => Arc::new(DiscardStore::new()),
    }
}
