//! Comment repository
//!
//! Comments and reactions both hang off an article through a
//! `(type, id)` pair, so they share one repository.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    Comment, CreateCommentInput, CreateReactionInput, Reaction, ReactionCategory, ARTICLE_TYPE,
};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment on an article
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    /// Get a comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Add a reaction; `None` when the user already reacted with that category
    async fn add_reaction(&self, input: &CreateReactionInput) -> Result<Option<Reaction>>;

    /// Whether the user reacted to the article in any category
    async fn has_reacted(&self, user_id: i64, article_id: i64) -> Result<bool>;
}

/// Comment repository implementation
pub struct CommentRepositoryImpl {
    pool: DynDatabasePool,
}

impl CommentRepositoryImpl {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for CommentRepositoryImpl {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn add_reaction(&self, input: &CreateReactionInput) -> Result<Option<Reaction>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => add_reaction_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => add_reaction_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn has_reacted(&self, user_id: i64, article_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) FROM reactions WHERE user_id = ? AND reactable_id = ? AND reactable_type = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar(sql)
                .bind(user_id)
                .bind(article_id)
                .bind(ARTICLE_TYPE)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to check reactions")?,
            DatabaseDriver::Mysql => sqlx::query_scalar(sql)
                .bind(user_id)
                .bind(article_id)
                .bind(ARTICLE_TYPE)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to check reactions")?,
        };
        Ok(count > 0)
    }
}

const COMMENT_COLUMNS: &str =
    "id, commentable_id, commentable_type, user_id, body_markdown, created_at, updated_at";

fn parse_category(raw: &str) -> Result<ReactionCategory> {
    ReactionCategory::parse(raw).ok_or_else(|| anyhow!("Invalid reaction category: {}", raw))
}

// SQLite implementations
async fn create_sqlite(pool: &SqlitePool, input: &CreateCommentInput) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO comments (commentable_id, commentable_type, user_id, body_markdown, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.commentable_id)
    .bind(ARTICLE_TYPE)
    .bind(input.user_id)
    .bind(&input.body_markdown)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        commentable_id: input.commentable_id,
        commentable_type: ARTICLE_TYPE.to_string(),
        user_id: input.user_id,
        body_markdown: input.body_markdown.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(&format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;

    Ok(row.map(|r| Comment {
        id: r.get("id"),
        commentable_id: r.get("commentable_id"),
        commentable_type: r.get("commentable_type"),
        user_id: r.get("user_id"),
        body_markdown: r.get("body_markdown"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }))
}

async fn add_reaction_sqlite(pool: &SqlitePool, input: &CreateReactionInput) -> Result<Option<Reaction>> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO reactions (user_id, reactable_id, reactable_type, category, points, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.user_id)
    .bind(input.reactable_id)
    .bind(ARTICLE_TYPE)
    .bind(input.category.as_str())
    .bind(1.0_f64)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to add reaction")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let row = sqlx::query(
        "SELECT id, user_id, reactable_id, reactable_type, category, points, created_at FROM reactions WHERE id = ?",
    )
    .bind(result.last_insert_rowid())
    .fetch_one(pool)
    .await
    .context("Failed to reload reaction")?;

    let category: String = row.get("category");
    Ok(Some(Reaction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        reactable_id: row.get("reactable_id"),
        reactable_type: row.get("reactable_type"),
        category: parse_category(&category)?,
        points: row.get("points"),
        created_at: row.get("created_at"),
    }))
}

// MySQL implementations
async fn create_mysql(pool: &MySqlPool, input: &CreateCommentInput) -> Result<Comment> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO comments (commentable_id, commentable_type, user_id, body_markdown, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.commentable_id)
    .bind(ARTICLE_TYPE)
    .bind(input.user_id)
    .bind(&input.body_markdown)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        commentable_id: input.commentable_id,
        commentable_type: ARTICLE_TYPE.to_string(),
        user_id: input.user_id,
        body_markdown: input.body_markdown.clone(),
        created_at: now,
        updated_at: now,
    })
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(&format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;

    Ok(row.map(|r| Comment {
        id: r.get("id"),
        commentable_id: r.get("commentable_id"),
        commentable_type: r.get("commentable_type"),
        user_id: r.get("user_id"),
        body_markdown: r.get("body_markdown"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }))
}

async fn add_reaction_mysql(pool: &MySqlPool, input: &CreateReactionInput) -> Result<Option<Reaction>> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT IGNORE INTO reactions (user_id, reactable_id, reactable_type, category, points, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.user_id)
    .bind(input.reactable_id)
    .bind(ARTICLE_TYPE)
    .bind(input.category.as_str())
    .bind(1.0_f64)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to add reaction")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let row = sqlx::query(
        "SELECT id, user_id, reactable_id, reactable_type, category, points, created_at FROM reactions WHERE id = ?",
    )
    .bind(result.last_insert_id() as i64)
    .fetch_one(pool)
    .await
    .context("Failed to reload reaction")?;

    let category: String = row.get("category");
    Ok(Some(Reaction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        reactable_id: row.get("reactable_id"),
        reactable_type: row.get("reactable_type"),
        category: parse_category(&category)?,
        points: row.get("points"),
        created_at: row.get("created_at"),
    }))
}
