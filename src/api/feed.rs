//! Feed API endpoints
//!
//! - GET /api/v1/feed - Paged article feed
//! - GET /api/v1/threads - Active discussion threads

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{non_blank, parse_opt, parse_or, split_list};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ArticleListResponse;
use crate::models::{ActiveThread, FeedParams, FeedType, ThreadsWindow, Timeframe};

/// Raw feed query; see [`FeedQuery::into_params`]
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    #[serde(rename = "type")]
    pub feed_type: Option<String>,
    pub timeframe: Option<String>,
    pub tag: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub minimum_score: Option<String>,
}

impl FeedQuery {
    pub fn into_params(self) -> FeedParams {
        let defaults = FeedParams::default();
        FeedParams {
            feed_type: self.feed_type.as_deref().and_then(FeedType::parse),
            timeframe: self.timeframe.as_deref().and_then(Timeframe::parse),
            tag: non_blank(self.tag.as_deref()),
            page: parse_or(self.page.as_deref(), defaults.page),
            per_page: parse_or(self.per_page.as_deref(), defaults.per_page),
            minimum_score: parse_opt(self.minimum_score.as_deref()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ThreadsQuery {
    pub tags: Option<String>,
    pub time_ago: Option<String>,
    pub count: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feed", get(get_feed))
        .route("/threads", get(get_threads))
}

/// GET /api/v1/feed
pub async fn get_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<ArticleListResponse>, ApiError> {
    let params = query.into_params();
    let result = state.feed_service.feed(&params).await?;
    Ok(Json(result.into()))
}

/// GET /api/v1/threads
pub async fn get_threads(
    State(state): State<AppState>,
    Query(query): Query<ThreadsQuery>,
) -> Result<Json<Vec<ActiveThread>>, ApiError> {
    let tags = split_list(query.tags.as_deref());
    let time_ago = query.time_ago.as_deref().and_then(ThreadsWindow::parse);
    let count = parse_opt(query.count.as_deref());

    let threads = state.threads_query.call(&tags, time_ago, count).await?;
    Ok(Json(threads))
}
