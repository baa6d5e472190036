//! Article service
//!
//! Article writes outside the feed: creation, publishing and score
//! updates. Callers enqueue a cache bust after any successful mutation.

use crate::db::repositories::{ArticleRepository, UserRepository};
use crate::models::{Article, CreateArticleInput};
use chrono::Utc;
use std::sync::Arc;

/// Upper bound on article titles, in characters
const MAX_TITLE_LENGTH: usize = 250;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    #[error("Article not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    users: Arc<dyn UserRepository>,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticleRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { repo, users }
    }

    pub async fn create(&self, input: &CreateArticleInput) -> Result<Article, ArticleServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(ArticleServiceError::ValidationError(format!(
                "Title cannot exceed {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if self.users.get_by_id(input.user_id).await?.is_none() {
            return Err(ArticleServiceError::NotFound(format!("user {}", input.user_id)));
        }

        let article = self
            .repo
            .create(&CreateArticleInput {
                title: title.to_string(),
                ..input.clone()
            })
            .await?;
        tracing::info!(article_id = article.id, path = %article.path, "Created article");
        Ok(article)
    }

    pub async fn get(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ArticleServiceError::NotFound(id.to_string()))
    }

    /// Publish a draft now; already-published articles are returned unchanged
    pub async fn publish(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.repo
            .publish(id, Utc::now())
            .await?
            .ok_or_else(|| ArticleServiceError::NotFound(id.to_string()))
    }

    pub async fn update_score(&self, id: i64, score: i64) -> Result<Article, ArticleServiceError> {
        self.repo
            .update_score(id, score)
            .await?
            .ok_or_else(|| ArticleServiceError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxArticleRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::CreateUserInput;

    async fn setup_test_service() -> (ArticleService, i64) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let users = SqlxUserRepository::boxed(pool.clone());
        let user_id = users.create(&CreateUserInput::new("ada", "Ada")).await.unwrap().id;
        let service = ArticleService::new(SqlxArticleRepository::boxed(pool), users);
        (service, user_id)
    }

    #[tokio::test]
    async fn test_create_validates_title_and_author() {
        let (service, user_id) = setup_test_service().await;

        let empty = service.create(&CreateArticleInput::new(user_id, "   ")).await;
        assert!(matches!(empty, Err(ArticleServiceError::ValidationError(_))));

        let long = service
            .create(&CreateArticleInput::new(user_id, "x".repeat(251)))
            .await;
        assert!(matches!(long, Err(ArticleServiceError::ValidationError(_))));

        let orphan = service.create(&CreateArticleInput::new(999, "Orphan")).await;
        assert!(matches!(orphan, Err(ArticleServiceError::NotFound(_))));

        let created = service
            .create(&CreateArticleInput::new(user_id, "Hello"))
            .await
            .unwrap();
        assert_eq!(created.path, "/ada/hello");
        assert!(!created.published);
    }

    #[tokio::test]
    async fn test_publish_and_score() {
        let (service, user_id) = setup_test_service().await;
        let draft = service
            .create(&CreateArticleInput::new(user_id, "Draft"))
            .await
            .unwrap();

        let published = service.publish(draft.id).await.unwrap();
        assert!(published.published);
        assert_eq!(published.nth_published_by_author, 1);

        let scored = service.update_score(draft.id, -7).await.unwrap();
        assert_eq!(scored.score, -7);

        assert!(matches!(
            service.update_score(999, 1).await,
            Err(ArticleServiceError::NotFound(_))
        ));
        assert!(matches!(service.get(999).await, Err(ArticleServiceError::NotFound(_))));
    }
}
