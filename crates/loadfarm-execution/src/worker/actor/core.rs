use std::collections::HashSet;
use std::mem;

use log::{debug, info, warn};
use loadfarm_server::actor::{Actor, ActorAction, ActorContext};

use crate::controller::ControllerClient;
use crate::id::SequenceCounter;
use crate::rpc::ServerMonitor;
use crate::worker::actor::WorkerActor;
use crate::worker::{WorkerEvent, WorkerLock, WorkerMetadata, WorkerOptions};

#[async_trait::async_trait]
impl Actor for WorkerActor {
    type Message = WorkerEvent;
    type Options = WorkerOptions;

    fn new(options: WorkerOptions) -> Self {
        let (host, port) = match &options.server {
            Some(server) => (
                server.external_host.clone(),
                server.external_port.unwrap_or(server.listen_port),
            ),
            None => ("127.0.0.1".to_string(), 0),
        };
        let metadata = WorkerMetadata {
            worker_id: options.worker_id,
            host,
            port,
        };
        Self {
            options,
            server: ServerMonitor::new(),
            metadata,
            lock: WorkerLock::default(),
            sequence: SequenceCounter::new(),
            running: HashSet::new(),
        }
    }

    async fn start(&mut self, ctx: &mut ActorContext<Self>) {
        let Some(server_options) = &self.options.server else {
            info!("worker {} started in process", self.options.worker_id);
            return;
        };
        let addr = (
            server_options.listen_host.clone(),
            server_options.listen_port,
        );
        let server = mem::take(&mut self.server);
        self.server = server.start(Self::serve(ctx.handle().clone(), addr)).await;
    }

    fn receive(&mut self, ctx: &mut ActorContext<Self>, message: Self::Message) -> ActorAction {
        match message {
            WorkerEvent::ServerReady { port, signal } => {
                self.handle_server_ready(ctx, port, signal)
            }
            WorkerEvent::RegistrationFailed { message } => {
                self.handle_registration_failed(ctx, message)
            }
            WorkerEvent::GetMetadata { result } => self.handle_get_metadata(ctx, result),
            WorkerEvent::AcquireLock { owner, result } => {
                self.handle_acquire_lock(ctx, owner, result)
            }
            WorkerEvent::ReleaseLock { owner, result } => {
                self.handle_release_lock(ctx, owner, result)
            }
            WorkerEvent::SubmitPartition {
                job_id,
                partition,
                result,
            } => self.handle_submit_partition(ctx, job_id, partition, result),
            WorkerEvent::PartitionCompleted {
                job_id,
                partition_id,
                outcome,
            } => self.handle_partition_completed(ctx, job_id, partition_id, outcome),
            WorkerEvent::Shutdown => ActorAction::Stop,
        }
    }

    async fn stop(self, _ctx: &mut ActorContext<Self>) {
        if let Some(options) = &self.options.server {
            let client = ControllerClient::new(options.controller.clone());
            match client.deregister_worker(self.options.worker_id).await {
                Ok(()) => info!(
                    "worker {} deregistered from the controller",
                    self.options.worker_id
                ),
                Err(e) => warn!(
                    "worker {} failed to deregister from the controller: {e}",
                    self.options.worker_id
                ),
            }
        }
        self.server.stop().await;
        debug!("worker {} has stopped", self.options.worker_id);
    }
}

impl WorkerActor {
    pub(super) fn options(&self) -> &WorkerOptions {
        &self.options
    }
}
