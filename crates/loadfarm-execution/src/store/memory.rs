use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::store::{BatchSink, WriteBatch};

type Table = BTreeMap<Vec<u8>, BTreeMap<String, Vec<u8>>>;

/// An in-memory wide-column table mapping row keys to column values.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Arc<Mutex<Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.table.lock().map(|table| table.len()).unwrap_or(0)
    }

    pub fn get(&self, row_key: &[u8], column: &str) -> Option<Vec<u8>> {
        let table = self.table.lock().ok()?;
        table.get(row_key)?.get(column).cloned()
    }
}

impl BatchSink for MemoryStore {
    fn open_batch(&self) -> Box<dyn WriteBatch> {
        Box::new(MemoryWriteBatch {
            table: Arc::clone(&self.table),
            writes: vec![],
        })
    }
}

struct MemoryWriteBatch {
    table: Arc<Mutex<Table>>,
    writes: Vec<(Vec<u8>, String, Vec<u8>)>,
}

#[async_trait]
impl WriteBatch for MemoryWriteBatch {
    fn put(&mut self, row_key: Vec<u8>, column: &str, value: Vec<u8>) {
        self.writes.push((row_key, column.to_string(), value));
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut table = self
            .table
            .lock()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        for (row_key, column, value) in self.writes {
            table.entry(row_key).or_default().insert(column, value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_is_visible_only_after_commit() -> StoreResult<()> {
        let store = MemoryStore::new();
        let mut batch = store.open_batch();
        batch.put(b"a".to_vec(), "value", b"1".to_vec());
        batch.put(b"b".to_vec(), "value", b"2".to_vec());
        assert_eq!(store.row_count(), 0);
        batch.commit().await?;
        assert_eq!(store.row_count(), 2);
        assert_eq!(store.get(b"b", "value"), Some(b"2".to_vec()));
        assert_eq!(store.get(b"b", "other"), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_dropped_batch_writes_nothing() {
        let store = MemoryStore::new();
        let mut batch = store.open_batch();
        batch.put(b"a".to_vec(), "value", vec![]);
        drop(batch);
        assert_eq!(store.row_count(), 0);
    }
}
