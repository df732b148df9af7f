use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::store::{BatchSink, WriteBatch};
use crate::task_runner::TaskRunnable;

/// Writes every quantum as one cell of a wide-column store.
pub struct SinkTask {
    sink: Arc<dyn BatchSink>,
    column: String,
    batch: Option<Box<dyn WriteBatch>>,
}

impl SinkTask {
    pub fn new(sink: Arc<dyn BatchSink>, column: impl Into<String>) -> Self {
        Self {
            sink,
            column: column.into(),
            batch: None,
        }
    }
}

#[async_trait]
impl TaskRunnable for SinkTask {
    fn on_batch_start(&mut self) {
        self.batch = Some(self.sink.open_batch());
    }

    fn on_quanta(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.batch
            .get_or_insert_with(|| self.sink.open_batch())
            .put(key, &self.column, value);
    }

    async fn on_batch_completion(&mut self) -> StoreResult<()> {
        match self.batch.take() {
            Some(batch) => batch.commit().await,
            None => Ok(()),
        }
    }

    async fn on_completion(&mut self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_sink_task_commits_batches() -> StoreResult<()> {
        let store = MemoryStore::new();
        let mut task = SinkTask::new(Arc::new(store.clone()), "payload");
        task.on_batch_start();
        task.on_quanta(b"k1".to_vec(), b"v1".to_vec());
        task.on_quanta(b"k2".to_vec(), b"v2".to_vec());
        assert_eq!(store.row_count(), 0);
        task.on_batch_completion().await?;
        task.on_completion().await?;
        assert_eq!(store.row_count(), 2);
        assert_eq!(store.get(b"k1", "payload"), Some(b"v1".to_vec()));
        Ok(())
    }
}
