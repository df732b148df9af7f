mod client;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use client::HttpReportClient;

use crate::error::ExecutionResult;
use crate::id::{JobId, PartitionId, WorkerId};

/// Progress of one partition since the previous report from the same partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub partition_id: PartitionId,
    /// The number of quanta committed since the previous report.
    pub quanta_completed: u64,
    /// The work time covered by this report.
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionFinishedReport {
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub partition_id: PartitionId,
    pub total_quanta_executed: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Accepted,
    NotFound,
}

/// Delivers reports from a worker to the controller that owns the job.
/// The URL is the callback URL carried by the partition.
#[async_trait]
pub trait ReportClient: Send + Sync + 'static {
    async fn report_progress(&self, url: &str, report: ProgressReport) -> ExecutionResult<()>;
    async fn report_finished(&self, url: &str, report: PartitionFinishedReport)
        -> ExecutionResult<()>;
}
