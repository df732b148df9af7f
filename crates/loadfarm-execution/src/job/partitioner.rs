use crate::error::{ExecutionError, ExecutionResult};
use crate::id::PartitionId;
use crate::job::{Job, Partition};

/// Splits the job into `n` partitions of near-equal size.
/// The first `total % n` partitions receive one extra quantum,
/// so the partition sizes always add up to the job total.
pub fn partition_job(
    job: &Job,
    n: usize,
    progress_url: &str,
    finished_url: &str,
) -> ExecutionResult<Vec<Partition>> {
    if n == 0 {
        return Err(ExecutionError::InvalidArgument(
            "cannot split a job into zero partitions".to_string(),
        ));
    }
    let count = u64::try_from(n)
        .map_err(|_| ExecutionError::InvalidArgument(format!("too many partitions: {n}")))?;
    let total = job.total_quanta();
    let share = total / count;
    let remainder = total % count;
    (0..count)
        .map(|i| {
            let partition_id = u32::try_from(i).map_err(|_| {
                ExecutionError::InvalidArgument(format!("too many partitions: {n}"))
            })?;
            let num_quanta = if i < remainder { share + 1 } else { share };
            Ok(Partition {
                partition_id: PartitionId::from(partition_id),
                task: job.task.with_num_quanta(num_quanta),
                progress_url: progress_url.to_string(),
                finished_url: finished_url.to_string(),
            })
        })
        .collect()
}
