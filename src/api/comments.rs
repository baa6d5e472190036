//! Comment and reaction API endpoints
//!
//! - POST /api/v1/comments - Comment on an article
//! - POST /api/v1/reactions - React to an article

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::jobs::Job;
use crate::models::{Comment, CreateCommentInput, CreateReactionInput, Reaction, ReactionCategory};

#[derive(Debug, Deserialize)]
pub struct CreateReactionRequest {
    pub user_id: i64,
    pub reactable_id: i64,
    pub category: String,
}

/// `reaction` is absent when the user already reacted in that category
#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub created: bool,
    pub reaction: Option<Reaction>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", post(create_comment))
        .route("/reactions", post(create_reaction))
}

/// POST /api/v1/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Json(input): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let comment = state.comment_service.create(&input).await?;

    state.enqueue(Job::BustCommentCache { comment_id: comment.id }).await;
    state.enqueue(Job::BustArticleCache { article_id: comment.commentable_id }).await;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// POST /api/v1/reactions
pub async fn create_reaction(
    State(state): State<AppState>,
    Json(body): Json<CreateReactionRequest>,
) -> Result<Json<ReactionResponse>, ApiError> {
    let category = ReactionCategory::parse(&body.category)
        .ok_or_else(|| ApiError::validation_error(format!("Unknown reaction category: {}", body.category)))?;

    let reaction = state
        .comment_service
        .react(&CreateReactionInput {
            user_id: body.user_id,
            reactable_id: body.reactable_id,
            category,
        })
        .await?;

    Ok(Json(ReactionResponse {
        created: reaction.is_some(),
        reaction,
    }))
}
