use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loadfarm_execution::controller::{SubmitOutcome, SubmitRejection};
use loadfarm_execution::error::{StoreError, StoreResult};
use loadfarm_execution::id::JobId;
use loadfarm_execution::job::{
    Job, JobStatus, KeyGeneratorDescriptor, Task, ValueGeneratorDescriptor,
};
use loadfarm_execution::local::LocalCluster;
use loadfarm_execution::store::{BatchSink, MemoryStore, WriteBatch};
use tokio::sync::watch;

const JOB_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn job(num_quanta: u64, batch_size: u64, progress_report_interval: u64) -> Job {
    Job::new(Task {
        key_generator: KeyGeneratorDescriptor::Sequential,
        value_generator: ValueGeneratorDescriptor::Random {
            size: 16,
            seed: Some(7),
        },
        column: "payload".to_string(),
        num_quanta,
        batch_size,
        progress_report_interval,
    })
}

/// Holds every commit until the gate is opened.
struct GatedStore {
    inner: MemoryStore,
    gate: watch::Receiver<bool>,
}

impl BatchSink for GatedStore {
    fn open_batch(&self) -> Box<dyn WriteBatch> {
        Box::new(GatedBatch {
            inner: self.inner.open_batch(),
            gate: self.gate.clone(),
        })
    }
}

struct GatedBatch {
    inner: Box<dyn WriteBatch>,
    gate: watch::Receiver<bool>,
}

#[async_trait]
impl WriteBatch for GatedBatch {
    fn put(&mut self, row_key: Vec<u8>, column: &str, value: Vec<u8>) {
        self.inner.put(row_key, column, value);
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let GatedBatch { inner, mut gate } = *self;
        let opened = gate.wait_for(|open| *open).await.is_ok();
        if !opened {
            return Err(StoreError::Unavailable("the gate was dropped".to_string()));
        }
        inner.commit().await
    }
}

/// Fails the n-th commit and every commit after it.
struct FailingStore {
    inner: MemoryStore,
    commits: Arc<AtomicUsize>,
    fail_from: usize,
}

impl BatchSink for FailingStore {
    fn open_batch(&self) -> Box<dyn WriteBatch> {
        Box::new(FailingBatch {
            inner: self.inner.open_batch(),
            commits: Arc::clone(&self.commits),
            fail_from: self.fail_from,
        })
    }
}

struct FailingBatch {
    inner: Box<dyn WriteBatch>,
    commits: Arc<AtomicUsize>,
    fail_from: usize,
}

#[async_trait]
impl WriteBatch for FailingBatch {
    fn put(&mut self, row_key: Vec<u8>, column: &str, value: Vec<u8>) {
        self.inner.put(row_key, column, value);
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let count = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= self.fail_from {
            return Err(StoreError::Unavailable("region offline".to_string()));
        }
        self.inner.commit().await
    }
}

async fn wait_for_quanta(
    cluster: &LocalCluster,
    job_id: JobId,
    quanta: u64,
) -> Result<JobStatus, Box<dyn std::error::Error>> {
    let deadline = tokio::time::Instant::now() + JOB_TIMEOUT;
    loop {
        if let Some(status) = cluster.farmer().get_job(job_id)? {
            if status.compute_quanta_completed() >= quanta {
                return Ok(status);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(format!("job {job_id} did not reach {quanta} quanta").into());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_job_is_split_over_local_workers() -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryStore::new();
    let cluster = LocalCluster::start(2, Arc::new(store.clone())).await?;
    let first = job(100, 10, 20);
    let first_id = first.job_id;

    let outcome = cluster.submit_job(first.clone()).await?;
    assert_eq!(outcome, SubmitOutcome::Accepted(first));
    let status = cluster.wait_for_job(first_id, JOB_TIMEOUT).await?;

    assert_eq!(status.partitions.len(), 2);
    let mut workers = vec![];
    for partition in status.partitions.values() {
        assert_eq!(partition.partition.num_quanta(), 50);
        assert_eq!(partition.compute_quanta_completed(), 50);
        assert_eq!(partition.quanta_mismatch(), None);
        let quanta = partition
            .progress_reports()
            .iter()
            .map(|r| r.quanta_completed)
            .collect::<Vec<_>>();
        assert_eq!(quanta, vec![20, 20, 10]);
        let finished = partition
            .finished_report()
            .map(|r| r.total_quanta_executed);
        assert_eq!(finished, Some(50));
        workers.push(partition.worker.worker_id);
    }
    workers.sort();
    workers.dedup();
    assert_eq!(workers.len(), 2);

    assert_eq!(status.compute_quanta_completed(), 100);
    assert_eq!(status.final_duration, Some(status.compute_total_duration()));
    assert_eq!(store.row_count(), 100);

    // Every lock has been released, so the workers can take the next job.
    let next = job(10, 5, 5);
    let next_id = next.job_id;
    assert!(matches!(
        cluster.submit_job(next).await?,
        SubmitOutcome::Accepted(_)
    ));
    let status = cluster.wait_for_job(next_id, JOB_TIMEOUT).await?;
    assert_eq!(status.partitions.len(), 2);
    assert_eq!(store.row_count(), 110);

    cluster.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_local_cluster_without_workers() -> Result<(), Box<dyn std::error::Error>> {
    let cluster = LocalCluster::start(0, Arc::new(MemoryStore::new())).await?;
    let job = job(10, 5, 5);
    let job_id = job.job_id;
    assert_eq!(
        cluster.submit_job(job).await?,
        SubmitOutcome::Rejected(SubmitRejection::NoCapacity)
    );
    assert!(cluster.farmer().get_job(job_id)?.is_none());
    cluster.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_more_workers_than_quanta() -> Result<(), Box<dyn std::error::Error>> {
    let store = MemoryStore::new();
    let cluster = LocalCluster::start(4, Arc::new(store.clone())).await?;
    let job = job(3, 2, 1);
    let job_id = job.job_id;
    cluster.submit_job(job).await?;
    let status = cluster.wait_for_job(job_id, JOB_TIMEOUT).await?;
    let mut sizes = status
        .partitions
        .values()
        .map(|p| p.partition.num_quanta())
        .collect::<Vec<_>>();
    sizes.sort();
    assert_eq!(sizes, vec![0, 1, 1, 1]);
    assert_eq!(store.row_count(), 3);
    cluster.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_busy_worker_is_not_assigned_a_second_job() -> Result<(), Box<dyn std::error::Error>>
{
    let store = MemoryStore::new();
    let (open, gate) = watch::channel(false);
    let sink = GatedStore {
        inner: store.clone(),
        gate,
    };
    let cluster = LocalCluster::start(1, Arc::new(sink)).await?;
    let first = job(10, 5, 5);
    let first_id = first.job_id;
    assert!(matches!(
        cluster.submit_job(first).await?,
        SubmitOutcome::Accepted(_)
    ));
    let second = job(10, 5, 5);
    assert_eq!(
        cluster.submit_job(second.clone()).await?,
        SubmitOutcome::Rejected(SubmitRejection::NoCapacity)
    );
    assert!(cluster.farmer().get_job(second.job_id)?.is_none());

    open.send(true)?;
    cluster.wait_for_job(first_id, JOB_TIMEOUT).await?;
    assert!(matches!(
        cluster.submit_job(second.clone()).await?,
        SubmitOutcome::Accepted(_)
    ));
    cluster.wait_for_job(second.job_id, JOB_TIMEOUT).await?;
    assert_eq!(store.row_count(), 20);
    cluster.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_commit_failure_keeps_committed_progress() -> Result<(), Box<dyn std::error::Error>>
{
    let store = MemoryStore::new();
    // Batches of 10 fail from the fourth commit on, which holds quantum 37.
    let sink = FailingStore {
        inner: store.clone(),
        commits: Arc::new(AtomicUsize::new(0)),
        fail_from: 4,
    };
    let cluster = LocalCluster::start(1, Arc::new(sink)).await?;
    let job = job(50, 10, 20);
    let job_id = job.job_id;
    cluster.submit_job(job).await?;

    let status = wait_for_quanta(&cluster, job_id, 30).await?;
    assert_eq!(status.compute_quanta_completed(), 30);
    assert_eq!(store.row_count(), 30);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let status = cluster
        .farmer()
        .get_job(job_id)?
        .ok_or("the job should be stored")?;
    assert_eq!(status.compute_quanta_completed(), 30);
    assert!(status.partitions.values().all(|p| !p.is_finished()));
    assert_eq!(status.final_duration, None);
    cluster.shutdown().await;
    Ok(())
}
