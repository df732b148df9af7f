use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ExecutionResult;
use crate::id::{ControllerId, JobId, WorkerId};
use crate::job::Partition;
use crate::worker::{WorkerClient, WorkerMetadata};

/// The operations a controller performs on one worker.
/// An error only concerns the worker that the control refers to.
#[async_trait]
pub trait WorkerControl: Send + Sync {
    async fn metadata(&self) -> ExecutionResult<WorkerMetadata>;
    /// Returns `false` if the worker is locked by a different owner.
    async fn acquire_lock(&self, owner: ControllerId) -> ExecutionResult<bool>;
    async fn release_lock(&self, owner: ControllerId) -> ExecutionResult<()>;
    async fn submit_partition(&self, job_id: JobId, partition: Partition) -> ExecutionResult<()>;
}

pub trait WorkerControlFactory: Send + Sync {
    fn worker_control(&self, worker: &WorkerMetadata) -> ExecutionResult<Arc<dyn WorkerControl>>;
}

pub struct HttpWorkerControl {
    client: WorkerClient,
}

impl HttpWorkerControl {
    pub fn new(worker: &WorkerMetadata) -> Self {
        Self {
            client: WorkerClient::new(worker.base_url()),
        }
    }
}

#[async_trait]
impl WorkerControl for HttpWorkerControl {
    async fn metadata(&self) -> ExecutionResult<WorkerMetadata> {
        self.client.metadata().await
    }

    async fn acquire_lock(&self, owner: ControllerId) -> ExecutionResult<bool> {
        self.client.acquire_lock(owner).await
    }

    async fn release_lock(&self, owner: ControllerId) -> ExecutionResult<()> {
        self.client.release_lock(owner).await
    }

    async fn submit_partition(&self, job_id: JobId, partition: Partition) -> ExecutionResult<()> {
        self.client.submit_partition(job_id, &partition).await
    }
}

/// Keeps one HTTP control per worker so that connections are reused.
/// The cached control is replaced when the worker address changes.
#[derive(Default)]
pub struct HttpWorkerControlFactory {
    controls: Mutex<HashMap<WorkerId, (WorkerMetadata, Arc<HttpWorkerControl>)>>,
}

impl HttpWorkerControlFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkerControlFactory for HttpWorkerControlFactory {
    fn worker_control(&self, worker: &WorkerMetadata) -> ExecutionResult<Arc<dyn WorkerControl>> {
        let mut controls = self.controls.lock()?;
        if let Some((metadata, control)) = controls.get(&worker.worker_id) {
            if metadata == worker {
                return Ok(Arc::clone(control) as Arc<dyn WorkerControl>);
            }
        }
        let control = Arc::new(HttpWorkerControl::new(worker));
        controls.insert(worker.worker_id, (worker.clone(), Arc::clone(&control)));
        Ok(control)
    }
}
