mod definition;
mod partitioner;
mod status;

pub use definition::{Job, KeyGeneratorDescriptor, Partition, Task, ValueGeneratorDescriptor};
pub use partitioner::partition_job;
pub use status::{JobStatus, PartitionStatus};
