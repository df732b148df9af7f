use loadfarm_server::actor::ActorHandle;
use loadfarm_server::ServerBuilder;
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::error::ExecutionResult;
use crate::worker::actor::WorkerActor;
use crate::worker::server::worker_routes;
use crate::worker::WorkerEvent;

impl WorkerActor {
    pub(super) async fn serve(
        handle: ActorHandle<WorkerActor>,
        addr: impl ToSocketAddrs,
    ) -> ExecutionResult<()> {
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();
        let (tx, rx) = tokio::sync::oneshot::channel();

        let routes = worker_routes(handle.clone());
        handle
            .send(WorkerEvent::ServerReady { port, signal: tx })
            .await?;

        ServerBuilder::new("loadfarm_worker")
            .add_routes(routes)
            .serve(listener, async {
                let _ = rx.await;
            })
            .await?;
        Ok(())
    }
}
