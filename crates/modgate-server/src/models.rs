//! API request and response models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for POST /api/v1/moderate/text.
#[derive(Debug, Deserialize)]
pub struct TextModerationRequest {
    /// Text to classify.
    pub text: String,
}

/// Request body for POST /api/v1/moderate/image.
#[derive(Debug, Default, Deserialize)]
pub struct ImageModerationRequest {
    /// Optional caption or accompanying text.
    #[serde(default)]
    pub text: Option<String>,
    /// Image URL or `data:image/` URI.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Response to an accepted submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionResponse {
    /// Task identifier for result lookup.
    pub id: String,
    /// Always "processing".
    pub status: String,
}

/// Response body for GET /api/v1/moderate/{task_id}.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskResultResponse {
    /// Queued or running.
    Processing,
    /// Finished; `result` may be error-shaped.
    Completed { result: Value },
    /// The worker could not produce a result.
    Failed { error: String },
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: HealthState,
}

/// Healthy or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// State of one dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ComponentHealth {
    /// A healthy component.
    pub fn healthy() -> Self {
        Self {
            status: HealthState::Healthy,
            details: None,
        }
    }

    /// An unhealthy component with a reason.
    pub fn unhealthy(details: impl Into<String>) -> Self {
        Self {
            status: HealthState::Unhealthy,
            details: Some(details.into()),
        }
    }

    /// Returns true if healthy.
    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

/// Response body for GET /health/ready.
///
/// Component names follow the deployment the API was first exposed on:
/// `redis` is the shared cache store and `celery` the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: HealthState,
    pub database: ComponentHealth,
    pub redis: ComponentHealth,
    pub celery: ComponentHealth,
    pub api: ComponentHealth,
    pub last_checked: DateTime<Utc>,
}

/// Response body for GET /api/v1/stats.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Accepted submissions.
    pub total_requests: i64,
    /// Submissions answered from the cache.
    pub cached_requests: i64,
    /// Mean classification latency in seconds.
    pub average_response_time: f64,
}
