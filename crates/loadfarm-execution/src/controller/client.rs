use reqwest::StatusCode;

use crate::controller::{SubmitOutcome, SubmitRejection};
use crate::error::ExecutionResult;
use crate::id::{JobId, WorkerId};
use crate::job::{Job, JobStatus};
use crate::rpc::{expect_status, ClientOptions};
use crate::worker::WorkerMetadata;

/// An HTTP client for the controller server.
#[derive(Debug, Clone)]
pub struct ControllerClient {
    base_url: String,
    client: reqwest::Client,
}

impl ControllerClient {
    pub fn new(options: ClientOptions) -> Self {
        Self::with_base_url(options.to_url_string())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn register_worker(&self, metadata: &WorkerMetadata) -> ExecutionResult<()> {
        let url = format!("{}/worker/register", self.base_url);
        let response = self.client.post(&url).json(metadata).send().await?;
        expect_status(&url, response, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    pub async fn deregister_worker(&self, worker_id: WorkerId) -> ExecutionResult<()> {
        let url = format!("{}/worker/register/{worker_id}", self.base_url);
        let response = self.client.delete(&url).send().await?;
        expect_status(&url, response, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    pub async fn submit_job(&self, job: &Job) -> ExecutionResult<SubmitOutcome> {
        let url = format!("{}/job", self.base_url);
        let response = self.client.post(&url).json(job).send().await?;
        let rejection = match response.status() {
            StatusCode::PRECONDITION_FAILED => SubmitRejection::NoCapacity,
            StatusCode::CONFLICT => SubmitRejection::DuplicateJob,
            StatusCode::SERVICE_UNAVAILABLE => SubmitRejection::SubmissionFailed,
            _ => {
                let response = expect_status(&url, response, StatusCode::ACCEPTED).await?;
                return Ok(SubmitOutcome::Accepted(response.json().await?));
            }
        };
        Ok(SubmitOutcome::Rejected(rejection))
    }

    pub async fn list_jobs(&self) -> ExecutionResult<Vec<JobId>> {
        let url = format!("{}/job", self.base_url);
        let response = self.client.get(&url).send().await?;
        let response = expect_status(&url, response, StatusCode::OK).await?;
        Ok(response.json().await?)
    }

    /// Returns `None` if the controller does not know the job.
    pub async fn get_job(&self, job_id: JobId) -> ExecutionResult<Option<JobStatus>> {
        let url = format!("{}/job/{job_id}", self.base_url);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_status(&url, response, StatusCode::OK).await?;
        Ok(Some(response.json().await?))
    }
}
