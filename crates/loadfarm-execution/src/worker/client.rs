use reqwest::StatusCode;

use crate::error::{ExecutionError, ExecutionResult};
use crate::id::{ControllerId, JobId};
use crate::job::Partition;
use crate::rpc::expect_status;
use crate::worker::WorkerMetadata;

/// An HTTP client for the worker server.
/// The client is cheap to clone and clones share the connection pool.
#[derive(Debug, Clone)]
pub struct WorkerClient {
    base_url: String,
    client: reqwest::Client,
}

impl WorkerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn metadata(&self) -> ExecutionResult<WorkerMetadata> {
        let url = format!("{}/worker/metadata", self.base_url);
        let response = self.client.get(&url).send().await?;
        let response = expect_status(&url, response, StatusCode::OK).await?;
        Ok(response.json().await?)
    }

    pub async fn acquire_lock(&self, owner: ControllerId) -> ExecutionResult<bool> {
        let url = format!("{}/worker/lock/{owner}", self.base_url);
        let response = self.client.put(&url).send().await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(true),
            StatusCode::CONFLICT => Ok(false),
            _ => {
                expect_status(&url, response, StatusCode::NO_CONTENT).await?;
                Err(ExecutionError::InternalError(format!(
                    "unexpected lock response from {url}"
                )))
            }
        }
    }

    pub async fn release_lock(&self, owner: ControllerId) -> ExecutionResult<()> {
        let url = format!("{}/worker/lock/{owner}", self.base_url);
        let response = self.client.delete(&url).send().await?;
        expect_status(&url, response, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    pub async fn submit_partition(
        &self,
        job_id: JobId,
        partition: &Partition,
    ) -> ExecutionResult<()> {
        let url = format!("{}/worker/job/{job_id}/partition", self.base_url);
        let response = self.client.post(&url).json(partition).send().await?;
        expect_status(&url, response, StatusCode::ACCEPTED).await?;
        Ok(())
    }
}
