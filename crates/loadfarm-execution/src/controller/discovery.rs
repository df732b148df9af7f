use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use log::info;

use crate::error::ExecutionResult;
use crate::id::WorkerId;
use crate::worker::WorkerMetadata;

#[async_trait]
pub trait WorkerDiscovery: Send + Sync {
    /// Returns the workers that can currently be asked for a lock, in no particular order.
    async fn list_available_workers(&self) -> ExecutionResult<Vec<WorkerMetadata>>;
}

/// The workers that have registered with this controller.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: RwLock<HashMap<WorkerId, WorkerMetadata>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, metadata: WorkerMetadata) -> ExecutionResult<()> {
        info!(
            "worker {} registered at {}:{}",
            metadata.worker_id, metadata.host, metadata.port
        );
        self.workers.write()?.insert(metadata.worker_id, metadata);
        Ok(())
    }

    pub fn deregister(&self, worker_id: WorkerId) -> ExecutionResult<bool> {
        Ok(self.workers.write()?.remove(&worker_id).is_some())
    }
}

#[async_trait]
impl WorkerDiscovery for WorkerRegistry {
    async fn list_available_workers(&self) -> ExecutionResult<Vec<WorkerMetadata>> {
        Ok(self.workers.read()?.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_deregister() -> ExecutionResult<()> {
        let registry = WorkerRegistry::new();
        let worker_id = WorkerId::random();
        let metadata = WorkerMetadata {
            worker_id,
            host: "a".to_string(),
            port: 1,
        };
        registry.register(metadata.clone())?;
        registry.register(WorkerMetadata {
            port: 2,
            ..metadata
        })?;
        let workers = registry.list_available_workers().await?;
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].port, 2);
        assert!(registry.deregister(worker_id)?);
        assert!(!registry.deregister(worker_id)?);
        assert!(registry.list_available_workers().await?.is_empty());
        Ok(())
    }
}
