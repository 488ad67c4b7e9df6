//! API route handlers.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{debug, error, info, warn};

use modgate_core::Content;
use modgate_worker::{TaskHandle, TaskState, METRICS_CONTENT_TYPE};

use crate::error::{ApiError, Result};
use crate::models::{
    HealthState, ImageModerationRequest, LivenessResponse, ReadinessResponse, StatsResponse,
    SubmissionResponse, TaskResultResponse, TextModerationRequest,
};
use crate::state::AppState;

/// POST /api/v1/moderate/text - Enqueue text for moderation.
pub async fn moderate_text(
    State(state): State<AppState>,
    Json(req): Json<TextModerationRequest>,
) -> Result<Json<SubmissionResponse>> {
    debug!(text_len = req.text.len(), "Text submission");
    submit(&state, Content::text(req.text))
}

/// POST /api/v1/moderate/image - Enqueue an image, with optional text.
pub async fn moderate_image(
    State(state): State<AppState>,
    Json(req): Json<ImageModerationRequest>,
) -> Result<Json<SubmissionResponse>> {
    let content = Content::from_parts(req.text, req.image_url).map_err(|e| {
        debug!("Rejected image submission: {}", e);
        e
    })?;

    submit(&state, content)
}

fn submit(state: &AppState, content: Content) -> Result<Json<SubmissionResponse>> {
    let handle = state.broker.enqueue(&content)?;

    state.metrics.moderation_requests.inc();
    if let Err(e) = state.stats.record_submission() {
        warn!("Failed to count submission: {}", e);
    }

    info!(task_id = %handle, "Submission accepted");

    Ok(Json(SubmissionResponse {
        id: handle.to_string(),
        status: "processing".to_string(),
    }))
}

/// GET /api/v1/moderate/{task_id} - Look up a task result.
pub async fn get_result(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResultResponse>> {
    let handle = TaskHandle::from_string(task_id);

    let response = match state.broker.state(&handle)? {
        None => return Err(ApiError::NotFound(format!("task {}", handle))),
        Some(TaskState::Queued | TaskState::Running) => TaskResultResponse::Processing,
        Some(TaskState::Completed(result)) => TaskResultResponse::Completed { result },
        Some(TaskState::Failed(error)) => TaskResultResponse::Failed { error },
    };

    Ok(Json(response))
}

/// GET /health - Liveness.
pub async fn health(State(state): State<AppState>) -> Json<LivenessResponse> {
    state.metrics.health_check_requests.inc();
    Json(LivenessResponse {
        status: HealthState::Healthy,
    })
}

/// GET /health/ready - Readiness of every dependency.
pub async fn readiness(State(state): State<AppState>) -> Json<ReadinessResponse> {
    state.metrics.health_check_requests.inc();

    let report = state.health.check().await;
    if report.status == HealthState::Unhealthy {
        state.metrics.health_check_failures.inc();
    }

    Json(report)
}

/// GET /api/v1/stats - Running statistics.
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state.stats.snapshot().map_err(|e| {
        error!("Error fetching stats: {}", e);
        ApiError::Internal("Error fetching statistics".to_string())
    })?;

    Ok(Json(StatsResponse {
        total_requests: stats.total_requests,
        cached_requests: stats.cached_requests,
        average_response_time: stats.average_response_time,
    }))
}

/// GET /api/v1/metrics - Prometheus exposition.
pub async fn get_metrics(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let body = state.metrics.render().map_err(|e| {
        error!("Error rendering metrics: {}", e);
        ApiError::Internal("Error rendering metrics".to_string())
    })?;

    Ok(([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body))
}
