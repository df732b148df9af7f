use std::future::Future;

use log::debug;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{ExecutionError, ExecutionResult};

pub enum ServerMonitor {
    Stopped,
    Pending {
        handle: JoinHandle<ExecutionResult<()>>,
    },
    Running {
        /// The shutdown signal to send to the server.
        signal: oneshot::Sender<()>,
        handle: JoinHandle<ExecutionResult<()>>,
        port: u16,
    },
}

impl Default for ServerMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMonitor {
    pub fn new() -> Self {
        Self::Stopped
    }

    pub async fn start(
        self,
        f: impl Future<Output = ExecutionResult<()>> + Send + 'static,
    ) -> Self {
        self.stop().await;
        Self::Pending {
            handle: tokio::spawn(f),
        }
    }

    pub fn ready(self, signal: oneshot::Sender<()>, port: u16) -> ExecutionResult<Self> {
        match self {
            Self::Pending { handle } => Ok(Self::Running {
                signal,
                handle,
                port,
            }),
            _ => Err(ExecutionError::InternalError(
                "the server must be in pending state before it can be ready".to_string(),
            )),
        }
    }

    pub async fn stop(self) {
        match self {
            Self::Stopped => {}
            Self::Pending { handle } => {
                handle.abort();
            }
            Self::Running {
                signal,
                handle,
                port,
            } => {
                debug!("stopping the server on port {port}");
                let _ = signal.send(());
                let _ = handle.await;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub enable_tls: bool,
    pub host: String,
    pub port: u16,
}

impl ClientOptions {
    pub fn to_url_string(&self) -> String {
        let scheme = if self.enable_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Turns a response with an unexpected status into an error that carries the response body.
pub(crate) async fn expect_status(
    url: &str,
    response: reqwest::Response,
    expected: reqwest::StatusCode,
) -> ExecutionResult<reqwest::Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ExecutionError::UnexpectedStatus {
        url: url.to_string(),
        status: status.as_u16(),
        message,
    })
}
