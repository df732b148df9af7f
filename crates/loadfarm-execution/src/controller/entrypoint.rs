use std::future::Future;
use std::sync::Arc;

use loadfarm_common::config::AppConfig;
use loadfarm_server::ServerBuilder;
use log::info;
use tokio::net::TcpListener;

use crate::controller::{
    controller_routes, ControllerOptions, HttpWorkerControlFactory, JobFarmer, ReportCallbacks,
    WorkerRegistry,
};
use crate::error::ExecutionResult;

/// Serves the controller API on the listener until the signal completes.
pub async fn serve_controller<F>(
    options: &ControllerOptions,
    listener: TcpListener,
    signal: F,
) -> ExecutionResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let port = match options.external_port {
        Some(port) => port,
        None => listener.local_addr()?.port(),
    };
    let callbacks = ReportCallbacks::new(format!("http://{}:{port}", options.external_host));
    let registry = Arc::new(WorkerRegistry::new());
    let farmer = Arc::new(JobFarmer::new(
        options.controller_id,
        registry.clone(),
        Arc::new(HttpWorkerControlFactory::new()),
        callbacks,
    ));
    info!("controller {} started", options.controller_id);
    ServerBuilder::new("loadfarm_controller")
        .add_routes(controller_routes(farmer, registry))
        .serve(listener, signal)
        .await?;
    Ok(())
}

/// Runs the controller until the process receives Ctrl-C.
pub async fn run_controller(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let options = ControllerOptions::new(config);
    let listener =
        TcpListener::bind((options.listen_host.clone(), options.listen_port)).await?;
    serve_controller(&options, listener, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutting down the controller");
    })
    .await?;
    Ok(())
}
