use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::store::{BatchSink, WriteBatch};

/// A store that drops every write and only counts them.
#[derive(Debug, Clone, Default)]
pub struct DiscardStore {
    writes: Arc<AtomicU64>,
}

impl DiscardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl BatchSink for DiscardStore {
    fn open_batch(&self) -> Box<dyn WriteBatch> {
        Box::new(DiscardWriteBatch {
            writes: Arc::clone(&self.writes),
            pending: 0,
        })
    }
}

struct DiscardWriteBatch {
    writes: Arc<AtomicU64>,
    pending: u64,
}

#[async_trait]
impl WriteBatch for DiscardWriteBatch {
    fn put(&mut self, _row_key: Vec<u8>, _column: &str, _value: Vec<u8>) {
        self.pending += 1;
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.writes.fetch_add(self.pending, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discard_store_counts_committed_writes() -> StoreResult<()> {
        let store = DiscardStore::new();
        let mut batch = store.open_batch();
        for i in 0..3u8 {
            batch.put(vec![i], "value", vec![]);
        }
        batch.commit().await?;
        assert_eq!(store.write_count(), 3);
        Ok(())
    }
}
