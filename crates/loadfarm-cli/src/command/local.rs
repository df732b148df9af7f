use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use loadfarm_common::config::AppConfig;
use loadfarm_execution::controller::SubmitOutcome;
use loadfarm_execution::job::Job;
use loadfarm_execution::local::LocalCluster;
use loadfarm_execution::store::{build_store, BatchSink};
use loadfarm_telemetry::telemetry::{init_telemetry, ResourceOptions};
use log::warn;

use crate::command::{build_runtime, read_task};

/// Runs one job on a controller and workers that live in this process.
pub(crate) fn run_local(
    job: &Path,
    workers: Option<usize>,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_telemetry(ResourceOptions { kind: "local" })?;
    let job = Job::new(read_task(job)?);
    let worker_count = workers.unwrap_or(config.local.worker_count);
    let store = build_store(&config.store.kind);
    build_runtime()?.block_on(run_job(job, worker_count, store, timeout))
}

async fn run_job(
    job: Job,
    worker_count: usize,
    store: Arc<dyn BatchSink>,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let job_id = job.job_id;
    let cluster = LocalCluster::start(worker_count, store).await?;
    if let SubmitOutcome::Rejected(rejection) = cluster.submit_job(job).await? {
        cluster.shutdown().await;
        return Err(format!("job {job_id} rejected: {rejection}").into());
    }
    let status = cluster.wait_for_job(job_id, timeout).await;
    cluster.shutdown().await;
    let status = status?;
    for (partition_id, partition) in &status.partitions {
        if let Some((completed, declared)) = partition.quanta_mismatch() {
            warn!("partition {partition_id} completed {completed} of {declared} quanta");
        }
    }
    println!(
        "job {job_id} completed {} quanta in {} partitions, total duration {:?}",
        status.compute_quanta_completed(),
        status.partitions.len(),
        status.final_duration.unwrap_or_default()
    );
    Ok(())
}
