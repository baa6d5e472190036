//! Comment service
//!
//! Comments and reactions on published articles. A new comment bumps the
//! article's `comments_count` and `last_comment_at`, which the active
//! threads query sorts by.

use crate::db::repositories::{ArticleRepository, CommentRepository};
use crate::models::{Article, Comment, CreateCommentInput, CreateReactionInput, Reaction};
use std::sync::Arc;

const MAX_COMMENT_LENGTH: usize = 25_000;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Article not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    articles: Arc<dyn ArticleRepository>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, articles: Arc<dyn ArticleRepository>) -> Self {
        Self { comments, articles }
    }

    pub async fn create(&self, input: &CreateCommentInput) -> Result<Comment, CommentServiceError> {
        let body = input.body_markdown.trim();
        if body.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment body cannot be empty".to_string(),
            ));
        }
        if body.chars().count() > MAX_COMMENT_LENGTH {
            return Err(CommentServiceError::ValidationError(format!(
                "Comment cannot exceed {} characters",
                MAX_COMMENT_LENGTH
            )));
        }

        let article = self.published_article(input.commentable_id).await?;

        let comment = self
            .comments
            .create(&CreateCommentInput {
                body_markdown: body.to_string(),
                ..input.clone()
            })
            .await?;
        self.articles
            .record_comment(article.id, comment.created_at)
            .await?;

        tracing::debug!(comment_id = comment.id, article_id = article.id, "Created comment");
        Ok(comment)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Comment>, CommentServiceError> {
        Ok(self.comments.get_by_id(id).await?)
    }

    /// React to an article; `None` when the same reaction already exists
    pub async fn react(&self, input: &CreateReactionInput) -> Result<Option<Reaction>, CommentServiceError> {
        self.published_article(input.reactable_id).await?;
        Ok(self.comments.add_reaction(input).await?)
    }

    async fn published_article(&self, id: i64) -> Result<Article, CommentServiceError> {
        match self.articles.get_by_id(id).await? {
            Some(article) if article.published => Ok(article),
            _ => Err(CommentServiceError::NotFound(id)),
        }
    }
}
