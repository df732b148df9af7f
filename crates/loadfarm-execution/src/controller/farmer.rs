use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use futures::future::join_all;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::controller::{WorkerControl, WorkerControlFactory, WorkerDiscovery};
use crate::error::ExecutionResult;
use crate::id::{ControllerId, JobId, WorkerId};
use crate::job::{partition_job, Job, JobStatus};
use crate::report::{PartitionFinishedReport, ProgressReport, ReportOutcome};
use crate::worker::WorkerMetadata;

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted(Job),
    Rejected(SubmitRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitRejection {
    /// No worker could be locked for the job.
    NoCapacity,
    /// A job with the same ID has been submitted before.
    DuplicateJob,
    /// At least one partition could not be handed to its worker.
    SubmissionFailed,
}

impl fmt::Display for SubmitRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitRejection::NoCapacity => write!(f, "no worker is available"),
            SubmitRejection::DuplicateJob => write!(f, "the job has already been submitted"),
            SubmitRejection::SubmissionFailed => {
                write!(f, "the job could not be submitted to every locked worker")
            }
        }
    }
}

/// Builds the callback URLs that workers use to report to this controller.
#[derive(Debug, Clone)]
pub struct ReportCallbacks {
    base_url: String,
}

impl ReportCallbacks {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn progress_url(&self, job_id: JobId) -> String {
        format!("{}/job/{job_id}/report/progress", self.base_url)
    }

    pub fn finished_url(&self, job_id: JobId) -> String {
        format!("{}/job/{job_id}/report/finished", self.base_url)
    }
}

type LockedWorker = (WorkerMetadata, Arc<dyn WorkerControl>);

struct JobEntry {
    status: JobStatus,
    /// The partitions whose worker lock has been released after the first finished report.
    released: usize,
}

/// Spreads jobs over the available workers and aggregates the reports they send back.
pub struct JobFarmer {
    controller_id: ControllerId,
    discovery: Arc<dyn WorkerDiscovery>,
    controls: Arc<dyn WorkerControlFactory>,
    callbacks: ReportCallbacks,
    /// Reports for the same job are applied one at a time under the job mutex.
    jobs: RwLock<HashMap<JobId, Arc<Mutex<JobEntry>>>>,
    /// Workers holding a partition of an unfinished job of this controller.
    assigned: Mutex<HashSet<WorkerId>>,
}

impl JobFarmer {
    pub fn new(
        controller_id: ControllerId,
        discovery: Arc<dyn WorkerDiscovery>,
        controls: Arc<dyn WorkerControlFactory>,
        callbacks: ReportCallbacks,
    ) -> Self {
        Self {
            controller_id,
            discovery,
            controls,
            callbacks,
            jobs: RwLock::new(HashMap::new()),
            assigned: Mutex::new(HashSet::new()),
        }
    }

    pub fn controller_id(&self) -> ControllerId {
        self.controller_id
    }

    pub async fn submit_job(&self, job: Job) -> ExecutionResult<SubmitOutcome> {
        job.task.validate()?;
        let job_id = job.job_id;
        if self.jobs.read()?.contains_key(&job_id) {
            warn!("job {job_id} has already been submitted");
            return Ok(SubmitOutcome::Rejected(SubmitRejection::DuplicateJob));
        }

        let workers = self.discovery.list_available_workers().await?;
        let workers = self.claim_workers(job_id, workers)?;
        let locked = self.lock_workers(job_id, workers).await;
        if locked.is_empty() {
            warn!("job {job_id} rejected: no worker could be locked");
            return Ok(SubmitOutcome::Rejected(SubmitRejection::NoCapacity));
        }

        let partitions = match partition_job(
            &job,
            locked.len(),
            &self.callbacks.progress_url(job_id),
            &self.callbacks.finished_url(job_id),
        ) {
            Ok(x) => x,
            Err(e) => {
                self.release_locks(&locked).await;
                return Err(e);
            }
        };

        // The status must be visible before any worker starts reporting.
        let mut status = JobStatus::new(job.clone());
        for ((worker, _), partition) in locked.iter().zip(partitions.iter()) {
            status.add_partition(partition.clone(), worker.clone());
        }
        let inserted = {
            let mut jobs = self.jobs.write()?;
            if jobs.contains_key(&job_id) {
                false
            } else {
                let entry = JobEntry {
                    status,
                    released: 0,
                };
                jobs.insert(job_id, Arc::new(Mutex::new(entry)));
                true
            }
        };
        if !inserted {
            self.release_locks(&locked).await;
            return Ok(SubmitOutcome::Rejected(SubmitRejection::DuplicateJob));
        }

        let submissions = locked
            .iter()
            .zip(partitions.iter())
            .map(|((_, control), partition)| control.submit_partition(job_id, partition.clone()));
        let mut failed = false;
        for ((worker, _), result) in locked.iter().zip(join_all(submissions).await) {
            if let Err(e) = result {
                error!(
                    "failed to submit job {job_id} to worker {}: {e}",
                    worker.worker_id
                );
                failed = true;
            }
        }
        if failed {
            let unfinished = self.withdraw_job(job_id, &locked)?;
            self.release_locks(&unfinished).await;
            return Ok(SubmitOutcome::Rejected(SubmitRejection::SubmissionFailed));
        }

        info!(
            "job {job_id} accepted with {} quanta on {} workers",
            job.total_quanta(),
            locked.len()
        );
        Ok(SubmitOutcome::Accepted(job))
    }

    /// Reserves the workers that are not assigned to another job of this controller.
    /// The worker lock alone cannot tell two jobs of the same owner apart.
    fn claim_workers(
        &self,
        job_id: JobId,
        workers: Vec<WorkerMetadata>,
    ) -> ExecutionResult<Vec<WorkerMetadata>> {
        let mut assigned = self.assigned.lock()?;
        let claimed = workers
            .into_iter()
            .filter(|worker| {
                let claimed = assigned.insert(worker.worker_id);
                if !claimed {
                    info!(
                        "worker {} is still busy with another job, skipping it for job {job_id}",
                        worker.worker_id
                    );
                }
                claimed
            })
            .collect();
        Ok(claimed)
    }

    fn unclaim_worker(&self, worker: &WorkerMetadata) {
        match self.assigned.lock() {
            Ok(mut assigned) => {
                assigned.remove(&worker.worker_id);
            }
            Err(e) => warn!("failed to unclaim worker {}: {e}", worker.worker_id),
        }
    }

    /// Removes a job whose submission failed and returns the workers
    /// that have not already released themselves with a finished report.
    fn withdraw_job(
        &self,
        job_id: JobId,
        locked: &[LockedWorker],
    ) -> ExecutionResult<Vec<LockedWorker>> {
        let Some(job) = self.jobs.write()?.remove(&job_id) else {
            return Ok(locked.to_vec());
        };
        let entry = job.lock()?;
        let unfinished = locked
            .iter()
            .filter(|(worker, _)| {
                !entry
                    .status
                    .partitions
                    .values()
                    .any(|p| p.worker.worker_id == worker.worker_id && p.is_finished())
            })
            .cloned()
            .collect();
        Ok(unfinished)
    }

    async fn lock_workers(&self, job_id: JobId, workers: Vec<WorkerMetadata>) -> Vec<LockedWorker> {
        let attempts = workers.into_iter().map(|worker| async move {
            let result = match self.controls.worker_control(&worker) {
                Ok(control) => match control.acquire_lock(self.controller_id).await {
                    Ok(true) => Ok(Some(control)),
                    Ok(false) => Ok(None),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };
            (worker, result)
        });
        let mut locked = vec![];
        for (worker, result) in join_all(attempts).await {
            match result {
                Ok(Some(control)) => {
                    locked.push((worker, control));
                    continue;
                }
                Ok(None) => {
                    info!(
                        "worker {} is locked by another controller for job {job_id}",
                        worker.worker_id
                    );
                }
                Err(e) => {
                    warn!("failed to lock worker {} for job {job_id}: {e}", worker.worker_id);
                }
            }
            self.unclaim_worker(&worker);
        }
        locked
    }

    async fn release_locks(&self, locked: &[LockedWorker]) {
        let releases = locked
            .iter()
            .map(|(worker, control)| self.release_lock_with(worker, control.as_ref()));
        join_all(releases).await;
    }

    async fn release_lock(&self, worker: &WorkerMetadata) {
        match self.controls.worker_control(worker) {
            Ok(control) => self.release_lock_with(worker, control.as_ref()).await,
            Err(e) => {
                warn!("failed to release worker {}: {e}", worker.worker_id);
                self.unclaim_worker(worker);
            }
        }
    }

    async fn release_lock_with(&self, worker: &WorkerMetadata, control: &dyn WorkerControl) {
        if let Err(e) = control.release_lock(self.controller_id).await {
            warn!("failed to release worker {}: {e}", worker.worker_id);
        }
        self.unclaim_worker(worker);
    }

    fn job(&self, job_id: JobId) -> ExecutionResult<Option<Arc<Mutex<JobEntry>>>> {
        Ok(self.jobs.read()?.get(&job_id).cloned())
    }

    pub fn handle_progress_report(
        &self,
        job_id: JobId,
        report: ProgressReport,
    ) -> ExecutionResult<ReportOutcome> {
        let Some(job) = self.job(job_id)? else {
            warn!("progress report for unknown job {job_id}");
            return Ok(ReportOutcome::NotFound);
        };
        let mut entry = job.lock()?;
        let partition_id = report.partition_id;
        let Some(partition) = entry.status.partitions.get_mut(&partition_id) else {
            warn!("progress report for unknown partition {partition_id} of job {job_id}");
            return Ok(ReportOutcome::NotFound);
        };
        let sequence_number = report.sequence_number;
        if !partition.add_progress_report(report) {
            warn!(
                "ignored duplicate progress report {sequence_number} \
                for job {job_id} partition {partition_id}"
            );
        }
        Ok(ReportOutcome::Accepted)
    }

    pub async fn handle_partition_finished_report(
        &self,
        job_id: JobId,
        report: PartitionFinishedReport,
    ) -> ExecutionResult<ReportOutcome> {
        let Some(job) = self.job(job_id)? else {
            warn!("finished report for unknown job {job_id}");
            return Ok(ReportOutcome::NotFound);
        };
        let worker = {
            let mut entry = job.lock()?;
            let partition_id = report.partition_id;
            let Some(partition) = entry.status.partitions.get_mut(&partition_id) else {
                warn!("finished report for unknown partition {partition_id} of job {job_id}");
                return Ok(ReportOutcome::NotFound);
            };
            if !partition.finish(report) {
                warn!(
                    "ignored duplicate finished report for job {job_id} partition {partition_id}"
                );
                return Ok(ReportOutcome::Accepted);
            }
            if let Some((completed, declared)) = partition.quanta_mismatch() {
                warn!(
                    "job {job_id} partition {partition_id} is inconsistent: \
                    {completed} quanta completed but {declared} quanta declared"
                );
            }
            partition.worker.clone()
        };
        self.release_lock(&worker).await;

        // The job is complete once every worker is free for the next job.
        let mut entry = job.lock()?;
        entry.released += 1;
        if entry.released == entry.status.partitions.len() {
            let duration = entry.status.compute_total_duration();
            entry.status.final_duration = Some(duration);
            info!(
                "job {job_id} finished with {} quanta in {duration:?}",
                entry.status.compute_quanta_completed()
            );
        }
        Ok(ReportOutcome::Accepted)
    }

    /// Returns a snapshot of the job status.
    pub fn get_job(&self, job_id: JobId) -> ExecutionResult<Option<JobStatus>> {
        match self.job(job_id)? {
            Some(job) => Ok(Some(job.lock()?.status.clone())),
            None => Ok(None),
        }
    }

    pub fn list_job_ids(&self) -> ExecutionResult<Vec<JobId>> {
        Ok(self.jobs.read()?.keys().copied().collect())
    }
}
