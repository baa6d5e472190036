//! Fragment cache busting
//!
//! Owns the `"<entity-type>-<id>/<qualifier>"` key scheme. Every bust is a
//! plain delete, so busting a cold key is a no-op and repeating a bust is
//! harmless.

use crate::cache::{Cache, CacheLayer};
use crate::models::{Article, User, ARTICLE_TYPE};
use crate::services::feed::CACHE_KEY_FEED;
use anyhow::Result;
use std::sync::Arc;

/// Key for one cached fragment of an entity
pub fn fragment_key(entity_type: &str, id: i64, qualifier: &str) -> String {
    format!("{}-{}/{}", entity_type.to_lowercase(), id, qualifier)
}

pub struct CacheBuster {
    cache: Arc<Cache>,
}

impl CacheBuster {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    /// Drop the comment thread and the commenter's fragment on the commentable
    pub async fn bust_comment(&self, commentable_type: &str, commentable_id: i64, username: &str) -> Result<()> {
        self.cache
            .delete(&fragment_key(commentable_type, commentable_id, "comments"))
            .await?;
        self.cache
            .delete(&fragment_key(commentable_type, commentable_id, username))
            .await?;

        if commentable_type.eq_ignore_ascii_case(ARTICLE_TYPE) {
            self.cache
                .delete(&fragment_key(ARTICLE_TYPE, commentable_id, "show"))
                .await?;
        }

        tracing::debug!(commentable_type, commentable_id, "Busted comment cache");
        Ok(())
    }

    pub async fn bust_user(&self, user: &User) -> Result<()> {
        self.cache.delete(&fragment_key("user", user.id, "profile")).await?;
        self.cache
            .delete(&fragment_key("user", user.id, &user.username))
            .await?;
        self.cache
            .delete_pattern(&fragment_key("user", user.id, "*"))
            .await?;

        tracing::debug!(user_id = user.id, "Busted user cache");
        Ok(())
    }

    /// Article fragments plus every cached feed page
    pub async fn bust_article(&self, article: &Article) -> Result<()> {
        self.cache
            .delete(&fragment_key(ARTICLE_TYPE, article.id, "show"))
            .await?;
        self.cache
            .delete(&fragment_key(ARTICLE_TYPE, article.id, "comments"))
            .await?;
        self.cache
            .delete_pattern(&format!("{}*", CACHE_KEY_FEED))
            .await?;

        tracing::debug!(article_id = article.id, "Busted article cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_test_cache;
    use chrono::Utc;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(60);

    fn user() -> User {
        let now = Utc::now();
        User {
            id: 4,
            username: "ada".to_string(),
            name: "Ada".to_string(),
            articles_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    async fn warm(cache: &Cache, keys: &[&str]) {
        for key in keys {
            cache.set(key, &"fragment".to_string(), TTL).await.unwrap();
        }
    }

    async fn is_cold(cache: &Cache, key: &str) -> bool {
        cache.get::<String>(key).await.unwrap().is_none()
    }

    #[test]
    fn test_fragment_key() {
        assert_eq!(fragment_key("Article", 12, "comments"), "article-12/comments");
        assert_eq!(fragment_key("user", 3, "*"), "user-3/*");
    }

    #[tokio::test]
    async fn test_bust_comment_on_article() {
        let cache = create_test_cache();
        warm(&cache, &["article-7/comments", "article-7/ada", "article-7/show", "article-8/show"]).await;
        let buster = CacheBuster::new(cache.clone());

        buster.bust_comment("Article", 7, "ada").await.unwrap();

        assert!(is_cold(&cache, "article-7/comments").await);
        assert!(is_cold(&cache, "article-7/ada").await);
        assert!(is_cold(&cache, "article-7/show").await);
        assert!(!is_cold(&cache, "article-8/show").await);
    }

    #[tokio::test]
    async fn test_bust_user_clears_every_fragment() {
        let cache = create_test_cache();
        warm(&cache, &["user-4/profile", "user-4/ada", "user-4/sidebar", "user-40/profile"]).await;
        let buster = CacheBuster::new(cache.clone());

        buster.bust_user(&user()).await.unwrap();

        assert!(is_cold(&cache, "user-4/profile").await);
        assert!(is_cold(&cache, "user-4/ada").await);
        assert!(is_cold(&cache, "user-4/sidebar").await);
        assert!(!is_cold(&cache, "user-40/profile").await);
    }

    #[tokio::test]
    async fn test_busting_twice_is_harmless() {
        let cache = create_test_cache();
        warm(&cache, &["user-4/profile"]).await;
        let buster = CacheBuster::new(cache.clone());

        buster.bust_user(&user()).await.unwrap();
        buster.bust_user(&user()).await.unwrap();
        buster.bust_comment("Article", 1, "nobody").await.unwrap();

        assert!(is_cold(&cache, "user-4/profile").await);
    }
}
