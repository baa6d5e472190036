//! API middleware and shared handler types
//!
//! Contains:
//! - Application state shared by every handler, and its job enqueue helper
//! - The JSON error envelope and its mapping from service errors
//! - Request statistics, reported by the health endpoint

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::db::DynDatabasePool;
use crate::jobs::{Job, JobError, JobQueue};
use crate::services::{
    ActiveThreadsQuery, ArticleService, ArticleServiceError, CommentService, CommentServiceError,
    FeedService, FeedServiceError, ModerationService, ModerationServiceError, TagService,
    TagServiceError, UserService, UserServiceError,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Sum of response times in microseconds
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Record every request's latency
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.request_stats.record(start.elapsed().as_micros() as u64);
    response
}

// ============================================================================
// Application State
// ============================================================================

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub feed_service: Arc<FeedService>,
    pub threads_query: Arc<ActiveThreadsQuery>,
    pub moderation_service: Arc<ModerationService>,
    pub article_service: Arc<ArticleService>,
    pub tag_service: Arc<TagService>,
    pub comment_service: Arc<CommentService>,
    pub user_service: Arc<UserService>,
    pub jobs: JobQueue,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Queue a cache bust after a committed write. A closed queue is logged,
    /// not returned, since the mutation itself already succeeded.
    pub async fn enqueue(&self, job: Job) {
        if let Err(e) = self.jobs.enqueue(job).await {
            tracing::warn!(job = job.name(), "Failed to enqueue job: {}", e);
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Log the cause and hide it from the client
fn internal(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("Request failed: {}", e);
    ApiError::internal_error("Internal server error")
}

impl From<FeedServiceError> for ApiError {
    fn from(e: FeedServiceError) -> Self {
        internal(e)
    }
}

impl From<ModerationServiceError> for ApiError {
    fn from(e: ModerationServiceError) -> Self {
        internal(e)
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(e: ArticleServiceError) -> Self {
        match e {
            ArticleServiceError::NotFound(what) => ApiError::not_found(format!("Not found: {}", what)),
            ArticleServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            e => internal(e),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound(id) => ApiError::not_found(format!("Article not found: {}", id)),
            e => internal(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(id) => ApiError::not_found(format!("Article not found: {}", id)),
            CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            e => internal(e),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::NotFound(id) => ApiError::not_found(format!("User not found: {}", id)),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UsernameTaken(name) => {
                ApiError::conflict(format!("Username already taken: {}", name))
            }
            e => internal(e),
        }
    }
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        internal(e)
    }
}
