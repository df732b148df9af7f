use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, warn};
use tokio::time::Instant;

use crate::error::TaskError;
use crate::generator::{GeneratorContext, KeyGenerator, ValueGenerator};
use crate::id::{JobId, PartitionId, SequenceCounter, WorkerId};
use crate::job::Partition;
use crate::report::{PartitionFinishedReport, ProgressReport, ReportClient};
use crate::task_runner::TaskRunnable;

/// The worker-side state shared by every partition that a worker executes.
#[derive(Clone)]
pub struct TaskContext {
    pub worker_id: WorkerId,
    pub report_client: Arc<dyn ReportClient>,
    pub sequence: SequenceCounter,
}

pub struct TaskExecutionLoop<R> {
    runnable: R,
    reporter: PartitionReporter,
    num_quanta: u64,
    batch_size: u64,
    progress_report_interval: u64,
    key_generator: Box<dyn KeyGenerator>,
    value_generator: Box<dyn ValueGenerator>,
}

impl<R: TaskRunnable> TaskExecutionLoop<R> {
    pub fn new(runnable: R, context: TaskContext, job_id: JobId, partition: Partition) -> Self {
        let generator_context = GeneratorContext {
            worker_id: context.worker_id,
            partition_id: partition.partition_id,
        };
        let key_generator = partition.task.key_generator.build(generator_context);
        let value_generator = partition.task.value_generator.build(generator_context);
        Self {
            runnable,
            num_quanta: partition.num_quanta(),
            // Both values are validated when the partition is submitted.
            batch_size: partition.task.batch_size.max(1),
            progress_report_interval: partition.task.progress_report_interval.max(1),
            reporter: PartitionReporter {
                context,
                job_id,
                partition_id: partition.partition_id,
                progress_url: partition.progress_url,
                finished_url: partition.finished_url,
            },
            key_generator,
            value_generator,
        }
    }

    /// Executes the partition batch by batch and returns the number of committed quanta.
    /// A failed commit aborts the partition without a finished report,
    /// after the quanta committed before it have been reported.
    pub async fn run(mut self) -> Result<u64, TaskError> {
        let mut committed = 0;
        let mut unreported = 0;
        let mut last_report = Instant::now();
        let mut start = 0;
        while start < self.num_quanta {
            let end = self.num_quanta.min(start + self.batch_size);
            self.runnable.on_batch_start();
            for quantum in start..end {
                let key = self.key_generator.key(quantum);
                let value = self.value_generator.value(quantum);
                self.runnable.on_quanta(key, value);
            }
            if let Err(source) = self.runnable.on_batch_completion().await {
                error!(
                    "job {} partition {} failed to commit quanta {start}..{end}: {source}",
                    self.reporter.job_id, self.reporter.partition_id
                );
                if unreported > 0 {
                    self.reporter.progress(unreported, &mut last_report).await;
                }
                return Err(TaskError::Store { committed, source });
            }
            committed += end - start;
            unreported += end - start;
            if unreported >= self.progress_report_interval {
                self.reporter.progress(unreported, &mut last_report).await;
                unreported = 0;
            }
            start = end;
        }
        if unreported > 0 {
            self.reporter.progress(unreported, &mut last_report).await;
        }
        if let Err(source) = self.runnable.on_completion().await {
            return Err(TaskError::Store { committed, source });
        }
        self.reporter.finished(committed).await;
        Ok(committed)
    }
}

struct PartitionReporter {
    context: TaskContext,
    job_id: JobId,
    partition_id: PartitionId,
    progress_url: String,
    finished_url: String,
}

impl PartitionReporter {
    async fn progress(&self, quanta_completed: u64, last_report: &mut Instant) {
        let now = Instant::now();
        let report = ProgressReport {
            job_id: self.job_id,
            worker_id: self.context.worker_id,
            partition_id: self.partition_id,
            quanta_completed,
            duration: now.duration_since(*last_report),
            timestamp: Utc::now(),
            sequence_number: self.context.sequence.next(),
        };
        *last_report = now;
        debug!(
            "job {} partition {} progress: {quanta_completed} quanta (sequence {})",
            self.job_id, self.partition_id, report.sequence_number
        );
        if let Err(e) = self
            .context
            .report_client
            .report_progress(&self.progress_url, report)
            .await
        {
            warn!(
                "failed to report progress for job {} partition {}: {e}",
                self.job_id, self.partition_id
            );
        }
    }

    async fn finished(&self, total_quanta_executed: u64) {
        let report = PartitionFinishedReport {
            job_id: self.job_id,
            worker_id: self.context.worker_id,
            partition_id: self.partition_id,
            total_quanta_executed,
            timestamp: Utc::now(),
        };
        if let Err(e) = self
            .context
            .report_client
            .report_finished(&self.finished_url, report)
            .await
        {
            warn!(
                "failed to report completion for job {} partition {}: {e}",
                self.job_id, self.partition_id
            );
        }
    }
}
