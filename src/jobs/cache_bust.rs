//! Cache-bust job bodies
//!
//! Each job re-resolves its entity by id. An entity that no longer exists
//! has nothing left to bust, so the job completes without touching the
//! cache. Cache-store failures propagate so the queue retries them.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Job, JobError, JobHandler};
use crate::cache::Cache;
use crate::db::repositories::{ArticleRepository, CommentRepository, UserRepository};
use crate::services::CacheBuster;

pub struct CacheBustHandler {
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
    articles: Arc<dyn ArticleRepository>,
    buster: CacheBuster,
}

impl CacheBustHandler {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
        articles: Arc<dyn ArticleRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            comments,
            users,
            articles,
            buster: CacheBuster::new(cache),
        }
    }

    async fn bust_comment(&self, comment_id: i64) -> Result<(), JobError> {
        let Some(comment) = self.comments.get_by_id(comment_id).await? else {
            tracing::debug!(comment_id, "Comment is gone, nothing to bust");
            return Ok(());
        };
        let Some(author) = self.users.get_by_id(comment.user_id).await? else {
            tracing::debug!(comment_id, user_id = comment.user_id, "Comment author is gone, nothing to bust");
            return Ok(());
        };

        self.buster
            .bust_comment(&comment.commentable_type, comment.commentable_id, &author.username)
            .await?;
        Ok(())
    }

    async fn bust_user(&self, user_id: i64) -> Result<(), JobError> {
        let Some(user) = self.users.get_by_id(user_id).await? else {
            tracing::debug!(user_id, "User is gone, nothing to bust");
            return Ok(());
        };
        self.buster.bust_user(&user).await?;
        Ok(())
    }

    async fn bust_article(&self, article_id: i64) -> Result<(), JobError> {
        let Some(article) = self.articles.get_by_id(article_id).await? else {
            tracing::debug!(article_id, "Article is gone, nothing to bust");
            return Ok(());
        };
        self.buster.bust_article(&article).await?;
        Ok(())
    }
}

#[async_trait]
impl JobHandler for CacheBustHandler {
    async fn perform(&self, job: &Job) -> Result<(), JobError> {
        match *job {
            Job::BustCommentCache { comment_id } => self.bust_comment(comment_id).await,
            Job::BustUserCache { user_id } => self.bust_user(user_id).await,
            Job::BustArticleCache { article_id } => self.bust_article(article_id).await,
        }
    }
}
