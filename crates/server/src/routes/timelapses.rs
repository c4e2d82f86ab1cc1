// crates/server/src/routes/timelapses.rs
//! Timelapse job endpoints.
//!
//! - POST   /timelapses       - submit a job
//! - GET    /timelapses       - list jobs that have not terminated
//! - DELETE /timelapses/{id}  - cancel a job

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::Method;
use axum::routing::{delete, get};
use axum::{Json, Router};
use rtsp_timelapse_core::{ProgressSink, ProgressSnapshot, TimelapseRequest};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CreateTimelapseResponse {
    pub timelapse: ProgressSnapshot,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct TimelapsesResponse {
    pub timelapses: Vec<ProgressSnapshot>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CancelResponse {
    pub result: String,
}

/// POST /api/timelapses - validate, register and start a job.
async fn create_timelapse(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TimelapseRequest>,
) -> ApiResult<Json<CreateTimelapseResponse>> {
    let sink: Arc<dyn ProgressSink> = state.broadcaster.clone();
    // The scheduler task runs detached; its handle is not needed here.
    let submitted = state.service.submit(request, sink).await?;
    Ok(Json(CreateTimelapseResponse {
        timelapse: submitted.snapshot,
    }))
}

/// GET /api/timelapses - jobs still in the registry.
async fn list_timelapses(State(state): State<Arc<AppState>>) -> Json<TimelapsesResponse> {
    Json(TimelapsesResponse {
        timelapses: state.service.list(),
    })
}

/// DELETE /api/timelapses/{id} - begin two-phase cancellation.
async fn cancel_timelapse(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CancelResponse>> {
    state.service.cancel(&id)?;
    Ok(Json(CancelResponse {
        result: "success".into(),
    }))
}

async fn not_implemented(method: Method) -> ApiError {
    tracing::warn!(%method, "Unsupported timelapse operation");
    ApiError::NotImplemented
}

/// Build the timelapses router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/timelapses",
            get(list_timelapses).post(create_timelapse),
        )
        .route(
            "/timelapses/{id}",
            delete(cancel_timelapse).fallback(not_implemented),
        )
}
