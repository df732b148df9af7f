use std::sync::Arc;

use loadfarm_common::config::AppConfig;
use loadfarm_server::Backoff;

use crate::error::ExecutionResult;
use crate::id::WorkerId;
use crate::report::{HttpReportClient, ReportClient};
use crate::rpc::ClientOptions;
use crate::store::{build_store, BatchSink};

#[readonly::make]
pub struct WorkerOptions {
    pub worker_id: WorkerId,
    /// The HTTP server settings, or `None` for an in-process worker.
    pub server: Option<WorkerServerOptions>,
    pub store: Arc<dyn BatchSink>,
    pub report_client: Arc<dyn ReportClient>,
}

#[derive(Debug, Clone)]
pub struct WorkerServerOptions {
    pub listen_host: String,
    pub listen_port: u16,
    pub external_host: String,
    /// The port advertised to the controller, or `None` to use the bound port.
    pub external_port: Option<u16>,
    pub controller: ClientOptions,
    pub registration_backoff: Backoff,
}

impl WorkerOptions {
    pub fn try_new(config: &AppConfig) -> ExecutionResult<Self> {
        let worker_id = match &config.worker.id {
            Some(id) => id.parse()?,
            None => WorkerId::random(),
        };
        let worker = &config.worker;
        Ok(Self {
            worker_id,
            server: Some(WorkerServerOptions {
                listen_host: worker.listen_host.clone(),
                listen_port: worker.listen_port,
                external_host: worker.external_host.clone(),
                external_port: (worker.external_port > 0).then_some(worker.external_port),
                controller: ClientOptions {
                    enable_tls: false,
                    host: worker.controller_host.clone(),
                    port: worker.controller_port,
                },
                registration_backoff: (&worker.registration).into(),
            }),
            store: build_store(&config.store.kind),
            report_client: Arc::new(HttpReportClient::new()),
        })
    }

    pub fn local(
        worker_id: WorkerId,
        store: Arc<dyn BatchSink>,
        report_client: Arc<dyn ReportClient>,
    ) -> Self {
        Self {
            worker_id,
            server: None,
            store,
            report_client,
        }
    }
}
