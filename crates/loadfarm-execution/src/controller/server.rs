use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::controller::{JobFarmer, SubmitOutcome, SubmitRejection, WorkerRegistry};
use crate::error::{ExecutionError, ExecutionResult};
use crate::id::{JobId, WorkerId};
use crate::job::{Job, JobStatus};
use crate::report::{PartitionFinishedReport, ProgressReport, ReportOutcome};
use crate::worker::WorkerMetadata;

#[derive(Clone)]
struct ControllerState {
    farmer: Arc<JobFarmer>,
    registry: Arc<WorkerRegistry>,
}

pub fn controller_routes(farmer: Arc<JobFarmer>, registry: Arc<WorkerRegistry>) -> Router {
    Router::new()
        .route("/job", post(submit_job).get(list_jobs))
        .route("/job/{job_id}", get(get_job))
        .route("/job/{job_id}/report/progress", post(report_progress))
        .route("/job/{job_id}/report/finished", post(report_finished))
        .route("/worker/register", post(register_worker))
        .route("/worker/register/{worker_id}", delete(deregister_worker))
        .with_state(ControllerState { farmer, registry })
}

pub(crate) fn rejection_status(rejection: SubmitRejection) -> StatusCode {
    match rejection {
        SubmitRejection::NoCapacity => StatusCode::PRECONDITION_FAILED,
        SubmitRejection::DuplicateJob => StatusCode::CONFLICT,
        SubmitRejection::SubmissionFailed => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn report_status(outcome: ReportOutcome) -> StatusCode {
    match outcome {
        ReportOutcome::Accepted => StatusCode::ACCEPTED,
        ReportOutcome::NotFound => StatusCode::NOT_FOUND,
    }
}

async fn submit_job(
    State(state): State<ControllerState>,
    Json(job): Json<Job>,
) -> ExecutionResult<Response> {
    match state.farmer.submit_job(job).await? {
        SubmitOutcome::Accepted(job) => Ok((StatusCode::ACCEPTED, Json(job)).into_response()),
        SubmitOutcome::Rejected(rejection) => {
            Ok((rejection_status(rejection), rejection.to_string()).into_response())
        }
    }
}

async fn list_jobs(State(state): State<ControllerState>) -> ExecutionResult<Json<Vec<JobId>>> {
    Ok(Json(state.farmer.list_job_ids()?))
}

async fn get_job(
    State(state): State<ControllerState>,
    Path(job_id): Path<JobId>,
) -> ExecutionResult<Json<JobStatus>> {
    match state.farmer.get_job(job_id)? {
        Some(status) => Ok(Json(status)),
        None => Err(ExecutionError::NotFound(format!("job {job_id}"))),
    }
}

async fn report_progress(
    State(state): State<ControllerState>,
    Path(job_id): Path<JobId>,
    Json(report): Json<ProgressReport>,
) -> ExecutionResult<StatusCode> {
    let outcome = state.farmer.handle_progress_report(job_id, report)?;
    Ok(report_status(outcome))
}

async fn report_finished(
    State(state): State<ControllerState>,
    Path(job_id): Path<JobId>,
    Json(report): Json<PartitionFinishedReport>,
) -> ExecutionResult<StatusCode> {
    let outcome = state
        .farmer
        .handle_partition_finished_report(job_id, report)
        .await?;
    Ok(report_status(outcome))
}

async fn register_worker(
    State(state): State<ControllerState>,
    Json(metadata): Json<WorkerMetadata>,
) -> ExecutionResult<StatusCode> {
    state.registry.register(metadata)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn deregister_worker(
    State(state): State<ControllerState>,
    Path(worker_id): Path<WorkerId>,
) -> ExecutionResult<StatusCode> {
    if state.registry.deregister(worker_id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ExecutionError::NotFound(format!("worker {worker_id}")))
    }
}
