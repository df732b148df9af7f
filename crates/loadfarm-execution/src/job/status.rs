use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::id::PartitionId;
use crate::job::{Job, Partition};
use crate::report::{PartitionFinishedReport, ProgressReport};
use crate::worker::WorkerMetadata;

/// The controller's view of a submitted job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job: Job,
    pub partitions: BTreeMap<PartitionId, PartitionStatus>,
    /// Set once every partition has finished.
    pub final_duration: Option<Duration>,
}

impl JobStatus {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            partitions: BTreeMap::new(),
            final_duration: None,
        }
    }

    pub fn add_partition(&mut self, partition: Partition, worker: WorkerMetadata) {
        self.partitions.insert(
            partition.partition_id,
            PartitionStatus::new(partition, worker),
        );
    }

    pub fn is_finished(&self) -> bool {
        !self.partitions.is_empty() && self.partitions.values().all(|p| p.is_finished())
    }

    pub fn compute_quanta_completed(&self) -> u64 {
        self.partitions
            .values()
            .map(|p| p.compute_quanta_completed())
            .sum()
    }

    pub fn compute_total_duration(&self) -> Duration {
        self.partitions
            .values()
            .map(|p| p.compute_total_duration())
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionStatus {
    pub partition: Partition,
    pub worker: WorkerMetadata,
    /// Progress reports ordered by sequence number.
    progress_reports: Vec<ProgressReport>,
    finished: Option<PartitionFinishedReport>,
}

impl PartitionStatus {
    pub fn new(partition: Partition, worker: WorkerMetadata) -> Self {
        Self {
            partition,
            worker,
            progress_reports: vec![],
            finished: None,
        }
    }

    /// Records the report unless a report with the same sequence number was seen before.
    pub fn add_progress_report(&mut self, report: ProgressReport) -> bool {
        match self
            .progress_reports
            .binary_search_by_key(&report.sequence_number, |r| r.sequence_number)
        {
            Ok(_) => false,
            Err(index) => {
                self.progress_reports.insert(index, report);
                true
            }
        }
    }

    pub fn progress_reports(&self) -> &[ProgressReport] {
        &self.progress_reports
    }

    pub fn compute_quanta_completed(&self) -> u64 {
        self.progress_reports
            .iter()
            .map(|r| r.quanta_completed)
            .sum()
    }

    pub fn compute_total_duration(&self) -> Duration {
        self.progress_reports.iter().map(|r| r.duration).sum()
    }

    /// Records the finished report and returns whether it is the first one.
    pub fn finish(&mut self, report: PartitionFinishedReport) -> bool {
        if self.finished.is_some() {
            return false;
        }
        self.finished = Some(report);
        true
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    pub fn finished_report(&self) -> Option<&PartitionFinishedReport> {
        self.finished.as_ref()
    }

    /// Returns the completed and the declared quanta if they differ.
    pub fn quanta_mismatch(&self) -> Option<(u64, u64)> {
        let completed = self.compute_quanta_completed();
        let declared = self.partition.num_quanta();
        (completed != declared).then_some((completed, declared))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::id::{JobId, WorkerId};
    use crate::job::{KeyGeneratorDescriptor, Task, ValueGeneratorDescriptor};

    fn status(num_quanta: u64) -> PartitionStatus {
        let partition = Partition {
            partition_id: PartitionId::from(0),
            task: Task {
                key_generator: KeyGeneratorDescriptor::Sequential,
                value_generator: ValueGeneratorDescriptor::Zero { size: 1 },
                column: "value".to_string(),
                num_quanta,
                batch_size: 10,
                progress_report_interval: 10,
            },
            progress_url: String::new(),
            finished_url: String::new(),
        };
        let worker = WorkerMetadata {
            worker_id: WorkerId::random(),
            host: "localhost".to_string(),
            port: 1,
        };
        PartitionStatus::new(partition, worker)
    }

    fn progress(sequence_number: u64, quanta_completed: u64, millis: u64) -> ProgressReport {
        ProgressReport {
            job_id: JobId::random(),
            worker_id: WorkerId::random(),
            partition_id: PartitionId::from(0),
            quanta_completed,
            duration: Duration::from_millis(millis),
            timestamp: Utc::now(),
            sequence_number,
        }
    }

    #[test]
    fn test_progress_reports_are_deduplicated_and_ordered() {
        let mut status = status(30);
        assert!(status.add_progress_report(progress(2, 10, 5)));
        assert!(status.add_progress_report(progress(0, 10, 5)));
        assert!(!status.add_progress_report(progress(2, 10, 5)));
        assert!(status.add_progress_report(progress(1, 10, 5)));
        let sequence = status
            .progress_reports()
            .iter()
            .map(|r| r.sequence_number)
            .collect::<Vec<_>>();
        assert_eq!(sequence, vec![0, 1, 2]);
        assert_eq!(status.compute_quanta_completed(), 30);
        assert_eq!(status.compute_total_duration(), Duration::from_millis(15));
        assert_eq!(status.quanta_mismatch(), None);
    }

    #[test]
    fn test_quanta_mismatch() {
        let mut status = status(50);
        status.add_progress_report(progress(0, 20, 1));
        assert_eq!(status.quanta_mismatch(), Some((20, 50)));
    }

    #[test]
    fn test_finish_only_once() {
        let mut status = status(10);
        let report = PartitionFinishedReport {
            job_id: JobId::random(),
            worker_id: status.worker.worker_id,
            partition_id: PartitionId::from(0),
            total_quanta_executed: 10,
            timestamp: Utc::now(),
        };
        assert!(!status.is_finished());
        assert!(status.finish(report.clone()));
        assert!(!status.finish(report));
        assert!(status.is_finished());
    }

    #[test]
    fn test_job_status_serde() -> Result<(), serde_json::Error> {
        let partition = status(10);
        let mut job = JobStatus::new(Job::new(partition.partition.task.clone()));
        job.add_partition(partition.partition.clone(), partition.worker.clone());
        let json = serde_json::to_string(&job)?;
        let parsed: JobStatus = serde_json::from_str(&json)?;
        assert_eq!(parsed.partitions.len(), 1);
        assert!(!parsed.is_finished());
        assert_eq!(parsed.final_duration, None);
        Ok(())
    }
}
