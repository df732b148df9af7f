//! A single-process cluster where the controller talks to worker actors directly.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use loadfarm_server::actor::{ActorHandle, ActorSystem};
use log::{info, warn};

use crate::controller::{
    JobFarmer, ReportCallbacks, SubmitOutcome, WorkerControl, WorkerControlFactory,
    WorkerRegistry,
};
use crate::error::{ExecutionError, ExecutionResult};
use crate::id::{ControllerId, JobId, WorkerId};
use crate::job::{Job, JobStatus, Partition};
use crate::report::{PartitionFinishedReport, ProgressReport, ReportClient, ReportOutcome};
use crate::store::BatchSink;
use crate::worker::{ask, WorkerActor, WorkerEvent, WorkerMetadata, WorkerOptions};

const LOCAL_CALLBACK_URL: &str = "local://controller";
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct LocalWorkerControl {
    handle: ActorHandle<WorkerActor>,
}

#[async_trait]
impl WorkerControl for LocalWorkerControl {
    async fn metadata(&self) -> ExecutionResult<WorkerMetadata> {
        ask(&self.handle, |result| WorkerEvent::GetMetadata { result }).await
    }

    async fn acquire_lock(&self, owner: ControllerId) -> ExecutionResult<bool> {
        ask(&self.handle, |result| WorkerEvent::AcquireLock { owner, result }).await
    }

    async fn release_lock(&self, owner: ControllerId) -> ExecutionResult<()> {
        ask(&self.handle, |result| WorkerEvent::ReleaseLock { owner, result }).await
    }

    async fn submit_partition(&self, job_id: JobId, partition: Partition) -> ExecutionResult<()> {
        ask(&self.handle, |result| WorkerEvent::SubmitPartition {
            job_id,
            partition,
            result,
        })
        .await?
    }
}

#[derive(Default)]
pub struct LocalWorkerControlFactory {
    workers: RwLock<HashMap<WorkerId, Arc<LocalWorkerControl>>>,
}

impl LocalWorkerControlFactory {
    fn add_worker(
        &self,
        worker_id: WorkerId,
        handle: ActorHandle<WorkerActor>,
    ) -> ExecutionResult<()> {
        self.workers
            .write()?
            .insert(worker_id, Arc::new(LocalWorkerControl { handle }));
        Ok(())
    }
}

impl WorkerControlFactory for LocalWorkerControlFactory {
    fn worker_control(&self, worker: &WorkerMetadata) -> ExecutionResult<Arc<dyn WorkerControl>> {
        let workers = self.workers.read()?;
        let control = workers
            .get(&worker.worker_id)
            .ok_or_else(|| ExecutionError::NotFound(format!("worker {}", worker.worker_id)))?;
        Ok(Arc::clone(control) as Arc<dyn WorkerControl>)
    }
}

/// Delivers reports to the farmer without going through the network.
/// The farmer is held weakly since the workers outlive the reports they send.
pub struct LocalReportClient {
    farmer: Weak<JobFarmer>,
}

impl LocalReportClient {
    fn farmer(&self) -> ExecutionResult<Arc<JobFarmer>> {
        self.farmer
            .upgrade()
            .ok_or_else(|| ExecutionError::InternalError("the controller has stopped".to_string()))
    }
}

fn check_outcome(outcome: ReportOutcome, job_id: JobId) -> ExecutionResult<()> {
    match outcome {
        ReportOutcome::Accepted => Ok(()),
        ReportOutcome::NotFound => Err(ExecutionError::NotFound(format!("job {job_id}"))),
    }
}

#[async_trait]
impl ReportClient for LocalReportClient {
    async fn report_progress(&self, _url: &str, report: ProgressReport) -> ExecutionResult<()> {
        let job_id = report.job_id;
        let outcome = self.farmer()?.handle_progress_report(job_id, report)?;
        check_outcome(outcome, job_id)
    }

    async fn report_finished(
        &self,
        _url: &str,
        report: PartitionFinishedReport,
    ) -> ExecutionResult<()> {
        let job_id = report.job_id;
        let outcome = self
            .farmer()?
            .handle_partition_finished_report(job_id, report)
            .await?;
        check_outcome(outcome, job_id)
    }
}

pub struct LocalCluster {
    system: ActorSystem,
    farmer: Arc<JobFarmer>,
    registry: Arc<WorkerRegistry>,
    workers: Vec<(WorkerId, ActorHandle<WorkerActor>)>,
}

impl LocalCluster {
    /// Starts a controller and `worker_count` workers that write to the same store.
    pub async fn start(worker_count: usize, store: Arc<dyn BatchSink>) -> ExecutionResult<Self> {
        let registry = Arc::new(WorkerRegistry::new());
        let controls = Arc::new(LocalWorkerControlFactory::default());
        let farmer = Arc::new(JobFarmer::new(
            ControllerId::random(),
            registry.clone(),
            controls.clone(),
            ReportCallbacks::new(LOCAL_CALLBACK_URL),
        ));
        let report_client = Arc::new(LocalReportClient {
            farmer: Arc::downgrade(&farmer),
        });

        let mut system = ActorSystem::new();
        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let worker_id = WorkerId::random();
            let options =
                WorkerOptions::local(worker_id, Arc::clone(&store), report_client.clone());
            let handle = system.spawn::<WorkerActor>(options);
            controls.add_worker(worker_id, handle.clone())?;
            let metadata = ask(&handle, |result| WorkerEvent::GetMetadata { result }).await?;
            registry.register(metadata)?;
            workers.push((worker_id, handle));
        }
        info!("local cluster started with {worker_count} workers");
        Ok(Self {
            system,
            farmer,
            registry,
            workers,
        })
    }

    pub fn farmer(&self) -> &Arc<JobFarmer> {
        &self.farmer
    }

    pub async fn submit_job(&self, job: Job) -> ExecutionResult<SubmitOutcome> {
        self.farmer.submit_job(job).await
    }

    /// Waits until every partition of the job has finished.
    pub async fn wait_for_job(
        &self,
        job_id: JobId,
        timeout: Duration,
    ) -> ExecutionResult<JobStatus> {
        let wait = async {
            let mut interval = tokio::time::interval(JOB_POLL_INTERVAL);
            loop {
                interval.tick().await;
                match self.farmer.get_job(job_id) {
                    Ok(Some(status)) if status.final_duration.is_some() => return Ok(status),
                    Ok(Some(_)) => {}
                    Ok(None) => return Err(ExecutionError::NotFound(format!("job {job_id}"))),
                    Err(e) => return Err(e),
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            ExecutionError::InternalError(format!("job {job_id} did not finish in {timeout:?}"))
        })?
    }

    pub async fn shutdown(mut self) {
        for (worker_id, handle) in &self.workers {
            if let Err(e) = self.registry.deregister(*worker_id) {
                warn!("failed to deregister worker {worker_id}: {e}");
            }
            let _ = handle.send(WorkerEvent::Shutdown).await;
        }
        self.system.join().await;
        info!("local cluster stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_local_worker_control() -> ExecutionResult<()> {
        let cluster = LocalCluster::start(1, Arc::new(MemoryStore::new())).await?;
        let (_, worker) = cluster.workers[0].clone();
        let control = LocalWorkerControl { handle: worker };
        let metadata = control.metadata().await?;
        assert_eq!(metadata.host, "127.0.0.1");

        let first = ControllerId::random();
        let second = ControllerId::random();
        assert!(control.acquire_lock(first).await?);
        assert!(!control.acquire_lock(second).await?);
        control.release_lock(second).await?;
        assert!(!control.acquire_lock(second).await?);
        control.release_lock(first).await?;
        assert!(control.acquire_lock(second).await?);
        cluster.shutdown().await;
        Ok(())
    }
}
