//! Shared API response types

use serde::{Deserialize, Serialize};

use crate::models::{Article, PagedResult};

/// Article as exposed over the API
#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleResponse {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub path: String,
    pub tag_list: Vec<String>,
    pub published: bool,
    pub published_at: Option<String>,
    pub score: i64,
    pub comments_count: i64,
    pub last_comment_at: Option<String>,
    pub nth_published_by_author: i32,
    pub created_at: String,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            tag_list: article.tag_list().into_iter().map(String::from).collect(),
            id: article.id,
            user_id: article.user_id,
            community_id: article.community_id,
            title: article.title,
            slug: article.slug,
            path: article.path,
            published: article.published,
            published_at: article.published_at.map(|dt| dt.to_rfc3339()),
            score: article.score,
            comments_count: article.comments_count,
            last_comment_at: article.last_comment_at.map(|dt| dt.to_rfc3339()),
            nth_published_by_author: article.nth_published_by_author,
            created_at: article.created_at.to_rfc3339(),
        }
    }
}

/// One page of articles
#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleListResponse {
    pub articles: Vec<ArticleResponse>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl From<PagedResult<Article>> for ArticleListResponse {
    fn from(result: PagedResult<Article>) -> Self {
        let total_pages = result.total_pages();
        Self {
            articles: result.items.into_iter().map(ArticleResponse::from).collect(),
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            total_pages,
        }
    }
}
