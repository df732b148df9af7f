mod core;
mod sink;

use async_trait::async_trait;

pub use self::core::{TaskContext, TaskExecutionLoop};
pub use self::sink::SinkTask;
use crate::error::StoreResult;

/// The store-specific half of a partition execution.
/// The execution loop owns batching and reporting while the runnable owns the writes.
#[async_trait]
pub trait TaskRunnable: Send {
    fn on_batch_start(&mut self);
    fn on_quanta(&mut self, key: Vec<u8>, value: Vec<u8>);
    /// Commits the writes of the current batch atomically.
    async fn on_batch_completion(&mut self) -> StoreResult<()>;
    async fn on_completion(&mut self) -> StoreResult<()>;
}
