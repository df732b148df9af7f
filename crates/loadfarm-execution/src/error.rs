use std::sync::PoisonError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use loadfarm_common::error::CommonError;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinError;

pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("error in HTTP client: {0}")]
    HttpClientError(#[from] reqwest::Error),
    #[error("error in JSON: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("unexpected HTTP status {status} from {url}: {message}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        message: String,
    },
    #[error("error in configuration: {0}")]
    ConfigError(#[from] CommonError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<JoinError> for ExecutionError {
    fn from(error: JoinError) -> Self {
        ExecutionError::InternalError(error.to_string())
    }
}

impl<T> From<PoisonError<T>> for ExecutionError {
    fn from(error: PoisonError<T>) -> Self {
        ExecutionError::InternalError(error.to_string())
    }
}

impl<T> From<mpsc::error::SendError<T>> for ExecutionError {
    fn from(error: mpsc::error::SendError<T>) -> Self {
        ExecutionError::InternalError(error.to_string())
    }
}

impl From<oneshot::error::RecvError> for ExecutionError {
    fn from(error: oneshot::error::RecvError) -> Self {
        ExecutionError::InternalError(error.to_string())
    }
}

impl IntoResponse for ExecutionError {
    fn into_response(self) -> Response {
        let status = match &self {
            ExecutionError::InvalidArgument(_) | ExecutionError::JsonError(_) => {
                StatusCode::BAD_REQUEST
            }
            ExecutionError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A failure reported by the backing store when a batch is committed.
/// No write of the failed batch is visible in the store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("internal store error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("batch commit failed after {committed} committed quanta: {source}")]
    Store {
        /// The quanta committed by the batches before the failed one.
        committed: u64,
        #[source]
        source: StoreError,
    },
}

impl TaskError {
    pub fn committed(&self) -> u64 {
        match self {
            TaskError::Store { committed, .. } => *committed,
        }
    }
}
