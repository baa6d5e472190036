//! Moderation API endpoints
//!
//! - GET /api/v1/moderations/articles - Moderation inbox as a JSON array

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::common::{non_blank, parse_opt};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{MembersFilter, ModerationFeed, ModerationParams};

#[derive(Debug, Default, Deserialize)]
pub struct ModerationQuery {
    pub user_id: Option<String>,
    pub feed: Option<String>,
    pub members: Option<String>,
    pub tag: Option<String>,
    pub community_id: Option<String>,
}

impl ModerationQuery {
    /// `user_id` is the only required parameter
    pub fn into_params(self) -> Result<ModerationParams, ApiError> {
        let user_id = parse_opt(self.user_id.as_deref())
            .ok_or_else(|| ApiError::validation_error("user_id is required"))?;

        Ok(ModerationParams {
            user_id,
            feed: ModerationFeed::parse(self.feed.as_deref()),
            members: self.members.as_deref().and_then(MembersFilter::parse),
            tag: non_blank(self.tag.as_deref()),
            community_id: parse_opt(self.community_id.as_deref()),
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/articles", get(list_articles))
}

/// GET /api/v1/moderations/articles
///
/// The body is serialized by the service so the wire shape stays fixed.
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ModerationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let params = query.into_params()?;
    let json = state.moderation_service.articles_json(&params).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], json))
}
