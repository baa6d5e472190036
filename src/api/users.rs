//! User API endpoints
//!
//! - POST /api/v1/users - Register a user
//! - PUT /api/v1/users/{id} - Update a user's profile

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::jobs::Job;
use crate::models::{CreateUserInput, UpdateUserInput, User};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", put(update_user))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.user_service.register(&input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/v1/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<User>, ApiError> {
    let user = state.user_service.update(id, &input).await?;
    state.enqueue(Job::BustUserCache { user_id: user.id }).await;
    Ok(Json(user))
}
