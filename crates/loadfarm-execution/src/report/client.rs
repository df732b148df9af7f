use async_trait::async_trait;
use serde::Serialize;

use crate::error::ExecutionResult;
use crate::report::{PartitionFinishedReport, ProgressReport, ReportClient};
use crate::rpc::expect_status;

#[derive(Debug, Clone, Default)]
pub struct HttpReportClient {
    client: reqwest::Client,
}

impl HttpReportClient {
    pub fn new() -> Self {
        Self::default()
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> ExecutionResult<()> {
        let response = self.client.post(url).json(body).send().await?;
        expect_status(url, response, reqwest::StatusCode::ACCEPTED).await?;
        Ok(())
    }
}

#[async_trait]
impl ReportClient for HttpReportClient {
    async fn report_progress(&self, url: &str, report: ProgressReport) -> ExecutionResult<()> {
        self.post(url, &report).await
    }

    async fn report_finished(
        &self,
        url: &str,
        report: PartitionFinishedReport,
    ) -> ExecutionResult<()> {
        self.post(url, &report).await
    }
}
