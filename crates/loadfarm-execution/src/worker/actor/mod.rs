mod core;
mod handler;
mod rpc;

use std::collections::HashSet;

use crate::id::{JobId, PartitionId, SequenceCounter};
use crate::rpc::ServerMonitor;
use crate::worker::{WorkerLock, WorkerMetadata, WorkerOptions};

pub struct WorkerActor {
    options: WorkerOptions,
    server: ServerMonitor,
    metadata: WorkerMetadata,
    lock: WorkerLock,
    /// The report sequence shared by every partition running on this worker.
    sequence: SequenceCounter,
    running: HashSet<(JobId, PartitionId)>,
}
