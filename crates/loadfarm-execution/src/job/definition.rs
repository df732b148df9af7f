use serde::{Deserialize, Serialize};

use crate::error::{ExecutionError, ExecutionResult};
use crate::id::{JobId, PartitionId};

/// A unit of benchmark work. A job is never mutated after it is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub task: Task,
}

impl Job {
    pub fn new(task: Task) -> Self {
        Self {
            job_id: JobId::random(),
            task,
        }
    }

    pub fn total_quanta(&self) -> u64 {
        self.task.num_quanta
    }
}

/// Describes the work to perform and how to split it into batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub key_generator: KeyGeneratorDescriptor,
    pub value_generator: ValueGeneratorDescriptor,
    /// The column that every generated value is written to.
    #[serde(default = "default_column")]
    pub column: String,
    pub num_quanta: u64,
    pub batch_size: u64,
    /// The number of quanta between two progress reports.
    pub progress_report_interval: u64,
}

fn default_column() -> String {
    "value".to_string()
}

impl Task {
    pub fn validate(&self) -> ExecutionResult<()> {
        if self.num_quanta == 0 {
            return Err(ExecutionError::InvalidArgument(
                "the number of quanta must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ExecutionError::InvalidArgument(
                "the batch size must be positive".to_string(),
            ));
        }
        if self.progress_report_interval == 0 {
            return Err(ExecutionError::InvalidArgument(
                "the progress report interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns a copy of the task that covers `num_quanta` quanta.
    pub fn with_num_quanta(&self, num_quanta: u64) -> Self {
        Self {
            num_quanta,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyGeneratorDescriptor {
    /// Keys derived from the worker, the partition, and the quantum index.
    /// Keys never collide across partitions of a job.
    Sequential,
    /// Uniformly random keys of a fixed size.
    Random {
        size: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueGeneratorDescriptor {
    Zero {
        size: usize,
    },
    Random {
        size: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
}

/// A contiguous slice of a job assigned to exactly one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub partition_id: PartitionId,
    /// The parent task, whose quanta count is the size of this slice.
    pub task: Task,
    pub progress_url: String,
    pub finished_url: String,
}

impl Partition {
    pub fn num_quanta(&self) -> u64 {
        self.task.num_quanta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_from_json() -> Result<(), serde_json::Error> {
        let task: Task = serde_json::from_str(
            r#"{
                "key_generator": {"kind": "sequential"},
                "value_generator": {"kind": "random", "size": 16},
                "num_quanta": 1000,
                "batch_size": 50,
                "progress_report_interval": 200
            }"#,
        )?;
        assert_eq!(task.key_generator, KeyGeneratorDescriptor::Sequential);
        assert_eq!(
            task.value_generator,
            ValueGeneratorDescriptor::Random {
                size: 16,
                seed: None
            }
        );
        assert_eq!(task.column, "value");
        assert!(task.validate().is_ok());
        Ok(())
    }

    #[test]
    fn test_task_validation() {
        let task = Task {
            key_generator: KeyGeneratorDescriptor::Sequential,
            value_generator: ValueGeneratorDescriptor::Zero { size: 1 },
            column: default_column(),
            num_quanta: 10,
            batch_size: 0,
            progress_report_interval: 5,
        };
        assert!(matches!(
            task.validate(),
            Err(ExecutionError::InvalidArgument(_))
        ));
        assert!(task.with_num_quanta(0).validate().is_err());
    }
}
