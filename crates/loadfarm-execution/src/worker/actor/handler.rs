use std::mem;
use std::sync::Arc;

use log::{error, info, warn};
use loadfarm_server::actor::{ActorAction, ActorContext};
use tokio::sync::oneshot;

use crate::controller::ControllerClient;
use crate::error::{ExecutionError, ExecutionResult, TaskError};
use crate::id::{ControllerId, JobId, PartitionId};
use crate::job::Partition;
use crate::task_runner::{SinkTask, TaskContext, TaskExecutionLoop};
use crate::worker::actor::WorkerActor;
use crate::worker::{WorkerEvent, WorkerMetadata};

impl WorkerActor {
    pub(super) fn handle_server_ready(
        &mut self,
        ctx: &mut ActorContext<Self>,
        port: u16,
        signal: oneshot::Sender<()>,
    ) -> ActorAction {
        let worker_id = self.options().worker_id;
        info!("worker {worker_id} server is ready on port {port}");
        let server = mem::take(&mut self.server);
        self.server = match server.ready(signal, port) {
            Ok(x) => x,
            Err(e) => return ActorAction::fail(e),
        };
        let Some(options) = self.options().server.clone() else {
            return ActorAction::Continue;
        };
        if options.external_port.is_none() {
            self.metadata.port = port;
        }
        let metadata = self.metadata.clone();
        let client = ControllerClient::new(options.controller);
        let backoff = options.registration_backoff;
        let handle = ctx.handle().clone();
        ctx.spawn(async move {
            let result = backoff
                .retry("worker registration", || {
                    let client = client.clone();
                    let metadata = metadata.clone();
                    async move { client.register_worker(&metadata).await }
                })
                .await;
            let event = match result {
                Ok(()) => {
                    info!("worker {} registered with the controller", metadata.worker_id);
                    return;
                }
                Err(e) => WorkerEvent::RegistrationFailed {
                    message: e.to_string(),
                },
            };
            let _ = handle.send(event).await;
        });
        ActorAction::Continue
    }

    pub(super) fn handle_registration_failed(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        message: String,
    ) -> ActorAction {
        error!(
            "worker {} failed to register with the controller: {message}",
            self.options().worker_id
        );
        ActorAction::Stop
    }

    pub(super) fn handle_get_metadata(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        result: oneshot::Sender<WorkerMetadata>,
    ) -> ActorAction {
        let _ = result.send(self.metadata.clone());
        ActorAction::Continue
    }

    pub(super) fn handle_acquire_lock(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        owner: ControllerId,
        result: oneshot::Sender<bool>,
    ) -> ActorAction {
        let acquired = self.lock.acquire(owner);
        if !acquired {
            info!(
                "worker {} refused lock for {owner}: held by {:?}",
                self.options().worker_id,
                self.lock.owner()
            );
        }
        let _ = result.send(acquired);
        ActorAction::Continue
    }

    pub(super) fn handle_release_lock(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        owner: ControllerId,
        result: oneshot::Sender<()>,
    ) -> ActorAction {
        if !self.lock.release(owner) {
            warn!(
                "worker {} ignored lock release from {owner}: held by {:?}",
                self.options().worker_id,
                self.lock.owner()
            );
        }
        let _ = result.send(());
        ActorAction::Continue
    }

    pub(super) fn handle_submit_partition(
        &mut self,
        ctx: &mut ActorContext<Self>,
        job_id: JobId,
        partition: Partition,
        result: oneshot::Sender<ExecutionResult<()>>,
    ) -> ActorAction {
        let partition_id = partition.partition_id;
        if let Err(e) = self.start_partition(ctx, job_id, partition) {
            warn!(
                "worker {} rejected job {job_id} partition {partition_id}: {e}",
                self.options().worker_id
            );
            let _ = result.send(Err(e));
            return ActorAction::Continue;
        }
        let _ = result.send(Ok(()));
        ActorAction::Continue
    }

    fn start_partition(
        &mut self,
        ctx: &mut ActorContext<Self>,
        job_id: JobId,
        partition: Partition,
    ) -> ExecutionResult<()> {
        let partition_id = partition.partition_id;
        if partition.task.batch_size == 0 || partition.task.progress_report_interval == 0 {
            return Err(ExecutionError::InvalidArgument(
                "the batch size and the progress report interval must be positive".to_string(),
            ));
        }
        if !self.running.insert((job_id, partition_id)) {
            return Err(ExecutionError::InvalidArgument(format!(
                "job {job_id} partition {partition_id} is already running"
            )));
        }
        info!(
            "worker {} running job {job_id} partition {partition_id} with {} quanta",
            self.options().worker_id,
            partition.num_quanta()
        );
        let runnable = SinkTask::new(Arc::clone(&self.options().store), &partition.task.column);
        let context = TaskContext {
            worker_id: self.options().worker_id,
            report_client: Arc::clone(&self.options().report_client),
            sequence: self.sequence.clone(),
        };
        let handle = ctx.handle().clone();
        ctx.spawn(async move {
            let outcome = TaskExecutionLoop::new(runnable, context, job_id, partition)
                .run()
                .await;
            let event = WorkerEvent::PartitionCompleted {
                job_id,
                partition_id,
                outcome,
            };
            let _ = handle.send(event).await;
        });
        Ok(())
    }

    pub(super) fn handle_partition_completed(
        &mut self,
        _ctx: &mut ActorContext<Self>,
        job_id: JobId,
        partition_id: PartitionId,
        outcome: Result<u64, TaskError>,
    ) -> ActorAction {
        self.running.remove(&(job_id, partition_id));
        let worker_id = self.options().worker_id;
        match outcome {
            Ok(quanta) => {
                info!(
                    "worker {worker_id} finished job {job_id} partition {partition_id} \
                    with {quanta} quanta"
                );
            }
            Err(e) => {
                error!("worker {worker_id} failed job {job_id} partition {partition_id}: {e}");
            }
        }
        ActorAction::Continue
    }
}
