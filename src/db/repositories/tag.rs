//! Tag repository
//!
//! Database operations for tags and the `article_tags` join table.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Get tag by its (normalized) name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// Return the tag with this name, creating it first if needed
    async fn find_or_create(&self, name: &str) -> Result<Tag>;

    /// Replace every tag association of an article and its denormalized
    /// `cached_tag_list`, atomically
    async fn replace_article_tags(
        &self,
        article_id: i64,
        tag_ids: &[i64],
        cached_tag_list: &str,
    ) -> Result<()>;

    /// Tags attached to an article, by name
    async fn list_for_article(&self, article_id: i64) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_name_sqlite(self.pool.sqlite()?, name).await,
            DatabaseDriver::Mysql => get_tag_by_name_mysql(self.pool.mysql()?, name).await,
        }
    }

    async fn find_or_create(&self, name: &str) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => find_or_create_tag_sqlite(self.pool.sqlite()?, name).await,
            DatabaseDriver::Mysql => find_or_create_tag_mysql(self.pool.mysql()?, name).await,
        }
    }

    async fn replace_article_tags(
        &self,
        article_id: i64,
        tag_ids: &[i64],
        cached_tag_list: &str,
    ) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                replace_article_tags_sqlite(self.pool.sqlite()?, article_id, tag_ids, cached_tag_list)
                    .await
            }
            DatabaseDriver::Mysql => {
                replace_article_tags_mysql(self.pool.mysql()?, article_id, tag_ids, cached_tag_list)
                    .await
            }
        }
    }

    async fn list_for_article(&self, article_id: i64) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_for_article_sqlite(self.pool.sqlite()?, article_id).await,
            DatabaseDriver::Mysql => list_tags_for_article_mysql(self.pool.mysql()?, article_id).await,
        }
    }
}

const LIST_FOR_ARTICLE_SQL: &str = r#"
    SELECT t.id, t.name, t.supported, t.created_at
    FROM tags t
    INNER JOIN article_tags at ON at.tag_id = t.id
    WHERE at.article_id = ?
    ORDER BY t.name
"#;

const SET_CACHED_TAG_LIST_SQL: &str =
    "UPDATE articles SET cached_tag_list = ?, updated_at = ? WHERE id = ?";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_tag_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, supported, created_at FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by name")?;

    Ok(row.as_ref().map(row_to_tag_sqlite))
}

async fn find_or_create_tag_sqlite(pool: &SqlitePool, name: &str) -> Result<Tag> {
    sqlx::query("INSERT OR IGNORE INTO tags (name, supported, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(false)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    get_tag_by_name_sqlite(pool, name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Tag vanished after insert: {}", name))
}

async fn replace_article_tags_sqlite(
    pool: &SqlitePool,
    article_id: i64,
    tag_ids: &[i64],
    cached_tag_list: &str,
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(SET_CACHED_TAG_LIST_SQL)
        .bind(cached_tag_list)
        .bind(Utc::now())
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update cached tag list")?;

    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article tags")?;

    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach tag to article")?;
    }

    tx.commit().await.context("Failed to commit article tags")?;
    Ok(())
}

async fn list_tags_for_article_sqlite(pool: &SqlitePool, article_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(LIST_FOR_ARTICLE_SQL)
        .bind(article_id)
        .fetch_all(pool)
        .await
        .context("Failed to list article tags")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        supported: row.get("supported"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_tag_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, supported, created_at FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by name")?;

    Ok(row.as_ref().map(row_to_tag_mysql))
}

async fn find_or_create_tag_mysql(pool: &MySqlPool, name: &str) -> Result<Tag> {
    sqlx::query("INSERT IGNORE INTO tags (name, supported, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(false)
        .bind(Utc::now())
        .execute(pool)
        .await
        .context("Failed to create tag")?;

    get_tag_by_name_mysql(pool, name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Tag vanished after insert: {}", name))
}

async fn replace_article_tags_mysql(
    pool: &MySqlPool,
    article_id: i64,
    tag_ids: &[i64],
    cached_tag_list: &str,
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(SET_CACHED_TAG_LIST_SQL)
        .bind(cached_tag_list)
        .bind(Utc::now())
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update cached tag list")?;

    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear article tags")?;

    for tag_id in tag_ids {
        sqlx::query("INSERT IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach tag to article")?;
    }

    tx.commit().await.context("Failed to commit article tags")?;
    Ok(())
}

async fn list_tags_for_article_mysql(pool: &MySqlPool, article_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(LIST_FOR_ARTICLE_SQL)
        .bind(article_id)
        .fetch_all(pool)
        .await
        .context("Failed to list article tags")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        supported: row.get("supported"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::article::{ArticleRepository, SqlxArticleRepository};
    use crate::db::repositories::user::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateArticleInput, CreateUserInput};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxTagRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxTagRepository::new(pool.clone());
        (pool, repo)
    }

    async fn create_test_article(pool: &DynDatabasePool) -> i64 {
        let user = SqlxUserRepository::new(pool.clone())
            .create(&CreateUserInput::new("ada", "Ada"))
            .await
            .expect("Failed to create test user");
        SqlxArticleRepository::new(pool.clone())
            .create(&CreateArticleInput::new(user.id, "Tagged").published())
            .await
            .expect("Failed to create test article")
            .id
    }

    #[tokio::test]
    async fn test_find_or_create_reuses_existing() {
        let (_pool, repo) = setup_test_repo().await;

        let first = repo.find_or_create("rust").await.expect("Failed to create tag");
        let second = repo.find_or_create("rust").await.expect("Failed to reuse tag");
        assert_eq!(first.id, second.id);
        assert!(!first.supported);

        assert_eq!(repo.get_by_name("rust").await.unwrap().map(|t| t.id), Some(first.id));
        assert!(repo.get_by_name("go").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_article_tags() {
        let (pool, repo) = setup_test_repo().await;
        let article_id = create_test_article(&pool).await;

        let rust = repo.find_or_create("rust").await.unwrap();
        let discuss = repo.find_or_create("discuss").await.unwrap();
        let help = repo.find_or_create("help").await.unwrap();

        repo.replace_article_tags(article_id, &[rust.id, discuss.id], "rust, discuss")
            .await
            .unwrap();
        let names: Vec<String> = repo
            .list_for_article(article_id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["discuss", "rust"]);

        repo.replace_article_tags(article_id, &[help.id, help.id], "help")
            .await
            .unwrap();
        let tags = repo.list_for_article(article_id).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "help");

        repo.replace_article_tags(article_id, &[], "").await.unwrap();
        assert!(repo.list_for_article(article_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_article_tags_is_atomic() {
        let (pool, repo) = setup_test_repo().await;
        let article_id = create_test_article(&pool).await;
        let articles = SqlxArticleRepository::new(pool.clone());

        let rust = repo.find_or_create("rust").await.unwrap();
        repo.replace_article_tags(article_id, &[rust.id], "rust")
            .await
            .unwrap();
        let cached = articles.get_by_id(article_id).await.unwrap().unwrap().cached_tag_list;
        assert_eq!(cached, "rust");

        // An unknown tag id violates the foreign key after the list was rewritten
        let result = repo
            .replace_article_tags(article_id, &[rust.id, 9999], "rust, ghost")
            .await;
        assert!(result.is_err());

        let cached = articles.get_by_id(article_id).await.unwrap().unwrap().cached_tag_list;
        assert_eq!(cached, "rust");
        let tags = repo.list_for_article(article_id).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "rust");
    }
}
