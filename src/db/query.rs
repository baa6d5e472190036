//! Composable article scopes
//!
//! An [`ArticleScope`] is an immutable-by-convention list of filters plus an
//! ordering and a window. Services build scopes from request parameters and
//! hand them to the article repository, which renders them to SQL for the
//! configured driver and binds the collected values. Nothing is executed
//! until the repository runs the rendered statement.
//!
//! Both drivers use `?` placeholders, so the rendered SQL only differs where
//! string concatenation is involved (the cached tag list match).

use chrono::{DateTime, Utc};
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};

use crate::config::DatabaseDriver;
use crate::models::ARTICLE_TYPE;

/// Columns selected for a full [`crate::models::Article`] row
pub const ARTICLE_COLUMNS: &str = "articles.id, articles.user_id, articles.community_id, \
    articles.title, articles.slug, articles.path, articles.cached_tag_list, articles.published, \
    articles.published_at, articles.score, articles.comments_count, articles.last_comment_at, \
    articles.nth_published_by_author, articles.created_at, articles.updated_at";

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

/// A single predicate over the `articles` table
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleFilter {
    Published,
    /// `published_at > t`
    PublishedAfter(DateTime<Utc>),
    /// `published_at >= t`
    PublishedSince(DateTime<Utc>),
    /// `score > n`
    ScoreAbove(i64),
    /// `score >= n`
    ScoreAtLeast(i64),
    /// `score BETWEEN lo AND hi`, both ends inclusive
    ScoreBetween(i64, i64),
    /// Exact tag-name match against the denormalized `cached_tag_list`
    CachedTag(String),
    /// Any of the names against `cached_tag_list`; an empty list matches nothing
    AnyCachedTag(Vec<String>),
    /// Tag membership through `article_tags`
    JoinedTag(String),
    Community(i64),
    TitleNot(String),
    /// No reaction from the given user on the article
    NotReactedBy(i64),
    /// `nth_published_by_author BETWEEN lo AND hi`
    NthPublishedBetween(i32, i32),
    /// `nth_published_by_author > n`
    NthPublishedAbove(i32),
    Author(i64),
}

impl ArticleFilter {
    fn render(&self, driver: DatabaseDriver, binds: &mut Vec<SqlValue>) -> String {
        match self {
            ArticleFilter::Published => {
                binds.push(SqlValue::Bool(true));
                "articles.published = ?".to_string()
            }
            ArticleFilter::PublishedAfter(at) => {
                binds.push(SqlValue::Timestamp(*at));
                "articles.published_at > ?".to_string()
            }
            ArticleFilter::PublishedSince(at) => {
                binds.push(SqlValue::Timestamp(*at));
                "articles.published_at >= ?".to_string()
            }
            ArticleFilter::ScoreAbove(n) => {
                binds.push(SqlValue::Int(*n));
                "articles.score > ?".to_string()
            }
            ArticleFilter::ScoreAtLeast(n) => {
                binds.push(SqlValue::Int(*n));
                "articles.score >= ?".to_string()
            }
            ArticleFilter::ScoreBetween(lo, hi) => {
                binds.push(SqlValue::Int(*lo));
                binds.push(SqlValue::Int(*hi));
                "articles.score BETWEEN ? AND ?".to_string()
            }
            ArticleFilter::CachedTag(name) => {
                binds.push(SqlValue::Text(cached_tag_pattern(name)));
                cached_tag_clause(driver).to_string()
            }
            ArticleFilter::AnyCachedTag(names) => {
                if names.is_empty() {
                    return "1 = 0".to_string();
                }
                let clauses: Vec<&str> = names
                    .iter()
                    .map(|name| {
                        binds.push(SqlValue::Text(cached_tag_pattern(name)));
                        cached_tag_clause(driver)
                    })
                    .collect();
                format!("({})", clauses.join(" OR "))
            }
            ArticleFilter::JoinedTag(name) => {
                binds.push(SqlValue::Text(name.clone()));
                "articles.id IN (SELECT at.article_id FROM article_tags at \
                 INNER JOIN tags t ON t.id = at.tag_id WHERE t.name = ?)"
                    .to_string()
            }
            ArticleFilter::Community(id) => {
                binds.push(SqlValue::Int(*id));
                "articles.community_id = ?".to_string()
            }
            ArticleFilter::TitleNot(title) => {
                binds.push(SqlValue::Text(title.clone()));
                "articles.title <> ?".to_string()
            }
            ArticleFilter::NotReactedBy(user_id) => {
                binds.push(SqlValue::Text(ARTICLE_TYPE.to_string()));
                binds.push(SqlValue::Int(*user_id));
                "NOT EXISTS (SELECT 1 FROM reactions r WHERE r.reactable_id = articles.id \
                 AND r.reactable_type = ? AND r.user_id = ?)"
                    .to_string()
            }
            ArticleFilter::NthPublishedBetween(lo, hi) => {
                binds.push(SqlValue::Int(i64::from(*lo)));
                binds.push(SqlValue::Int(i64::from(*hi)));
                "articles.nth_published_by_author BETWEEN ? AND ?".to_string()
            }
            ArticleFilter::NthPublishedAbove(n) => {
                binds.push(SqlValue::Int(i64::from(*n)));
                "articles.nth_published_by_author > ?".to_string()
            }
            ArticleFilter::Author(user_id) => {
                binds.push(SqlValue::Int(*user_id));
                "articles.user_id = ?".to_string()
            }
        }
    }
}

/// `", " || list || ","` wraps every name in a `, name,` frame so a LIKE on
/// the frame only matches whole names.
fn cached_tag_clause(driver: DatabaseDriver) -> &'static str {
    match driver {
        DatabaseDriver::Sqlite => "(', ' || articles.cached_tag_list || ',') LIKE ?",
        DatabaseDriver::Mysql => "CONCAT(', ', articles.cached_tag_list, ',') LIKE ?",
    }
}

fn cached_tag_pattern(name: &str) -> String {
    format!("%, {},%", name)
}

/// Result ordering; every variant ends with `articles.id DESC`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleOrder {
    #[default]
    PublishedAtDesc,
    /// Score first, newest first among equal scores
    ScoreDesc,
    CommentsCountDesc,
    LastCommentAtDesc,
}

impl ArticleOrder {
    fn sql(&self) -> &'static str {
        match self {
            ArticleOrder::PublishedAtDesc => "articles.published_at DESC, articles.id DESC",
            ArticleOrder::ScoreDesc => {
                "articles.score DESC, articles.published_at DESC, articles.id DESC"
            }
            ArticleOrder::CommentsCountDesc => "articles.comments_count DESC, articles.id DESC",
            ArticleOrder::LastCommentAtDesc => "articles.last_comment_at DESC, articles.id DESC",
        }
    }
}

/// A lazily-rendered article query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleScope {
    pub filters: Vec<ArticleFilter>,
    pub order: ArticleOrder,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ArticleScope {
    /// Every article
    pub fn all() -> Self {
        Self::default()
    }

    /// Published articles only
    pub fn published() -> Self {
        Self::all().filter(ArticleFilter::Published)
    }

    pub fn filter(mut self, filter: ArticleFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: ArticleOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The same predicates without ordering or window
    pub fn unpaged(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            ..Self::default()
        }
    }

    fn where_clause(&self, driver: DatabaseDriver, binds: &mut Vec<SqlValue>) -> String {
        if self.filters.is_empty() {
            return String::new();
        }
        let clauses: Vec<String> = self
            .filters
            .iter()
            .map(|filter| filter.render(driver, binds))
            .collect();
        format!(" WHERE {}", clauses.join(" AND "))
    }

    /// Render a `SELECT` of full article rows
    pub fn to_select_sql(&self, driver: DatabaseDriver) -> (String, Vec<SqlValue>) {
        let mut binds = Vec::new();
        let mut sql = format!("SELECT {} FROM articles", ARTICLE_COLUMNS);
        sql.push_str(&self.where_clause(driver, &mut binds));
        sql.push_str(" ORDER BY ");
        sql.push_str(self.order.sql());

        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                binds.push(SqlValue::Int(limit));
                binds.push(SqlValue::Int(offset.unwrap_or(0)));
            }
            (None, Some(offset)) => {
                // Both dialects need a LIMIT before OFFSET
                sql.push_str(" LIMIT ? OFFSET ?");
                binds.push(SqlValue::Int(i64::MAX));
                binds.push(SqlValue::Int(offset));
            }
            (None, None) => {}
        }

        (sql, binds)
    }

    /// Render a `SELECT COUNT(*) AS count` over the same predicates
    pub fn to_count_sql(&self, driver: DatabaseDriver) -> (String, Vec<SqlValue>) {
        let mut binds = Vec::new();
        let mut sql = "SELECT COUNT(*) AS count FROM articles".to_string();
        sql.push_str(&self.where_clause(driver, &mut binds));
        (sql, binds)
    }
}

/// Bind collected values onto a SQLite query
pub fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

/// Bind collected values onto a MySQL query
pub fn bind_mysql<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    values: &[SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    for value in values {
        query = match value {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Timestamp(v) => query.bind(*v),
        };
    }
    query
}
