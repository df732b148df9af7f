use loadfarm_common::config::AppConfig;
use loadfarm_server::actor::ActorSystem;
use log::{error, info};

use crate::worker::{WorkerActor, WorkerEvent, WorkerOptions};

/// Runs a worker until it stops or the process receives Ctrl-C.
pub async fn run_worker(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut system = ActorSystem::new();
    let options = WorkerOptions::try_new(config)?;
    let handle = system.spawn::<WorkerActor>(options);
    let signal = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for the shutdown signal: {e}");
            return;
        }
        info!("shutting down the worker");
        let _ = handle.send(WorkerEvent::Shutdown).await;
    });
    system.join().await;
    signal.abort();
    Ok(())
}
