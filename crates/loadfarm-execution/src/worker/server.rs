use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use loadfarm_server::actor::ActorHandle;

use crate::error::ExecutionResult;
use crate::id::{ControllerId, JobId};
use crate::job::Partition;
use crate::worker::{ask, WorkerActor, WorkerEvent, WorkerMetadata};

type WorkerState = State<ActorHandle<WorkerActor>>;

pub(crate) fn worker_routes(handle: ActorHandle<WorkerActor>) -> Router {
    Router::new()
        .route("/worker/metadata", get(get_metadata))
        .route(
            "/worker/lock/{owner_id}",
            put(acquire_lock).delete(release_lock),
        )
        .route("/worker/job/{job_id}/partition", post(submit_partition))
        .with_state(handle)
}

async fn get_metadata(State(handle): WorkerState) -> ExecutionResult<Json<WorkerMetadata>> {
    let metadata = ask(&handle, |result| WorkerEvent::GetMetadata { result }).await?;
    Ok(Json(metadata))
}

async fn acquire_lock(
    State(handle): WorkerState,
    Path(owner): Path<ControllerId>,
) -> ExecutionResult<StatusCode> {
    let acquired = ask(&handle, |result| WorkerEvent::AcquireLock { owner, result }).await?;
    if acquired {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::CONFLICT)
    }
}

async fn release_lock(
    State(handle): WorkerState,
    Path(owner): Path<ControllerId>,
) -> ExecutionResult<StatusCode> {
    ask(&handle, |result| WorkerEvent::ReleaseLock { owner, result }).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_partition(
    State(handle): WorkerState,
    Path(job_id): Path<JobId>,
    Json(partition): Json<Partition>,
) -> ExecutionResult<StatusCode> {
    ask(&handle, |result| WorkerEvent::SubmitPartition {
        job_id,
        partition,
        result,
    })
    .await??;
    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::id::WorkerId;
    use crate::report::HttpReportClient;
    use crate::store::MemoryStore;
    use crate::worker::WorkerOptions;

    fn router() -> Router {
        let options = WorkerOptions::local(
            WorkerId::random(),
            Arc::new(MemoryStore::new()),
            Arc::new(HttpReportClient::new()),
        );
        worker_routes(ActorHandle::new(options))
    }

    #[tokio::test]
    async fn test_lock_routes() -> Result<(), Box<dyn std::error::Error>> {
        let router = router();
        let first = ControllerId::random();
        let second = ControllerId::random();
        let request = |method: &str, owner: ControllerId| {
            Request::builder()
                .method(method)
                .uri(format!("/worker/lock/{owner}"))
                .body(Body::empty())
        };

        let response = router.clone().oneshot(request("PUT", first)?).await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = router.clone().oneshot(request("PUT", second)?).await?;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let response = router.clone().oneshot(request("DELETE", second)?).await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = router.clone().oneshot(request("PUT", second)?).await?;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let response = router.clone().oneshot(request("DELETE", first)?).await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = router.oneshot(request("PUT", second)?).await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_owner_id() -> Result<(), Box<dyn std::error::Error>> {
        let response = router()
            .oneshot(
                Request::put("/worker/lock/not-a-uuid").body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
