//! Article API endpoints
//!
//! - POST /api/v1/articles - Create an article (draft or published)
//! - POST /api/v1/articles/{id}/publish - Publish a draft
//! - PUT /api/v1/articles/{id}/score - Set the ranking score
//! - PUT /api/v1/articles/{id}/tags - Replace the tag list
//!
//! Every mutation enqueues an article cache bust, which also drops cached
//! feed pages.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ArticleResponse;
use crate::jobs::Job;
use crate::models::CreateArticleInput;

#[derive(Debug, Deserialize)]
pub struct UpdateScoreRequest {
    pub score: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagsRequest {
    #[serde(default)]
    pub tags: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/articles", post(create_article))
        .route("/articles/{id}/publish", post(publish_article))
        .route("/articles/{id}/score", put(update_score))
        .route("/articles/{id}/tags", put(update_tags))
}

/// POST /api/v1/articles
pub async fn create_article(
    State(state): State<AppState>,
    Json(input): Json<CreateArticleInput>,
) -> Result<(StatusCode, Json<ArticleResponse>), ApiError> {
    let article = state.article_service.create(&input).await?;
    if article.published {
        state.enqueue(Job::BustArticleCache { article_id: article.id }).await;
    }
    Ok((StatusCode::CREATED, Json(article.into())))
}

/// POST /api/v1/articles/{id}/publish
pub async fn publish_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state.article_service.publish(id).await?;
    state.enqueue(Job::BustArticleCache { article_id: article.id }).await;
    Ok(Json(article.into()))
}

/// PUT /api/v1/articles/{id}/score
pub async fn update_score(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateScoreRequest>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state.article_service.update_score(id, body.score).await?;
    state.enqueue(Job::BustArticleCache { article_id: article.id }).await;
    Ok(Json(article.into()))
}

/// PUT /api/v1/articles/{id}/tags
pub async fn update_tags(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTagsRequest>,
) -> Result<Json<ArticleResponse>, ApiError> {
    state.tag_service.assign_tags(id, &body.tags).await?;
    let article = state.article_service.get(id).await?;
    state.enqueue(Job::BustArticleCache { article_id: article.id }).await;
    Ok(Json(article.into()))
}
