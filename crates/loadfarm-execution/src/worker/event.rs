use loadfarm_server::actor::ActorHandle;
use tokio::sync::oneshot;

use crate::error::{ExecutionResult, TaskError};
use crate::id::{ControllerId, JobId, PartitionId};
use crate::job::Partition;
use crate::worker::{WorkerActor, WorkerMetadata};

pub enum WorkerEvent {
    ServerReady {
        /// The local port that the worker server listens on.
        /// This may be different from the port accessible from the controller.
        port: u16,
        signal: oneshot::Sender<()>,
    },
    RegistrationFailed {
        message: String,
    },
    GetMetadata {
        result: oneshot::Sender<WorkerMetadata>,
    },
    AcquireLock {
        owner: ControllerId,
        result: oneshot::Sender<bool>,
    },
    ReleaseLock {
        owner: ControllerId,
        result: oneshot::Sender<()>,
    },
    SubmitPartition {
        job_id: JobId,
        partition: Partition,
        result: oneshot::Sender<ExecutionResult<()>>,
    },
    PartitionCompleted {
        job_id: JobId,
        partition_id: PartitionId,
        outcome: Result<u64, TaskError>,
    },
    Shutdown,
}

/// Sends an event that carries a reply channel and waits for the reply.
pub(crate) async fn ask<T>(
    handle: &ActorHandle<WorkerActor>,
    event: impl FnOnce(oneshot::Sender<T>) -> WorkerEvent,
) -> ExecutionResult<T> {
    let (tx, rx) = oneshot::channel();
    handle.send(event(tx)).await?;
    Ok(rx.await?)
}
