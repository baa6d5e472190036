//! Article model
//!
//! This module provides:
//! - `Article` entity, including the denormalized `cached_tag_list`
//! - Input type for creating articles
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator used inside `cached_tag_list`
pub const TAG_LIST_SEPARATOR: &str = ", ";

/// Article entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// Owning author
    pub user_id: i64,
    /// Sub-community the article was posted to, if any
    pub community_id: Option<i64>,
    pub title: String,
    /// Slug, unique per author
    pub slug: String,
    /// Public path, `/<username>/<slug>`
    pub path: String,
    /// Comma+space joined tag names, kept in sync with `article_tags`
    pub cached_tag_list: String,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    /// Server-maintained ranking signal
    pub score: i64,
    pub comments_count: i64,
    pub last_comment_at: Option<DateTime<Utc>>,
    /// 1 for an author's first published article, 2 for the second, ...
    /// 0 while unpublished.
    pub nth_published_by_author: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Tag names from the cached list, in stored order
    pub fn tag_list(&self) -> Vec<&str> {
        split_tag_list(&self.cached_tag_list)
    }

    /// Whether the cached list carries `tag` (exact name match)
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_list().iter().any(|t| *t == tag)
    }
}

/// Split a cached tag list into names
pub fn split_tag_list(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Join tag names into the cached representation
pub fn join_tag_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(TAG_LIST_SEPARATOR)
}

/// Input for creating a new article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleInput {
    pub user_id: i64,
    pub title: String,
    /// Derived from the title when absent
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub community_id: Option<i64>,
    #[serde(default)]
    pub published: bool,
    /// Publication time; defaults to now when `published` is set
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub score: i64,
}

impl CreateArticleInput {
    /// A draft article with the given author and title
    pub fn new(user_id: i64, title: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            slug: None,
            community_id: None,
            published: false,
            published_at: None,
            score: 0,
        }
    }

    /// Publish now
    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }

    /// Publish at a specific time (may be in the past)
    pub fn published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published = true;
        self.published_at = Some(at);
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = score;
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn in_community(mut self, community_id: i64) -> Self {
        self.community_id = Some(community_id);
        self
    }

    /// The slug that will be stored
    pub fn resolved_slug(&self) -> String {
        match &self.slug {
            Some(slug) if !slug.trim().is_empty() => generate_slug(slug),
            _ => generate_slug(&self.title),
        }
    }
}

/// Generate a URL-friendly slug from a title
///
/// Lowercases ASCII, keeps non-ASCII letters, and collapses every other run
/// of characters into a single hyphen.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters, clamping `per_page` to `1..=100`
    pub fn new(page: u32, per_page: u32) -> Self {
        Self::with_max(page, per_page, 100)
    }

    /// Like [`ListParams::new`] with a caller-chosen upper bound
    pub fn with_max(page: u32, per_page: u32, max_per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, max_per_page.max(1)),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// Paginated result container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        u32::try_from((self.total + per_page - 1) / per_page).unwrap_or(u32::MAX)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_slug() {
        assert_eq!(generate_slug("Hello World"), "hello-world");
        assert_eq!(generate_slug("  Rust: 2024 edition!  "), "rust-2024-edition");
        assert_eq!(generate_slug("snake_case__title"), "snake-case-title");
        assert_eq!(generate_slug("!!!"), "untitled");
    }

    #[test]
    fn test_resolved_slug_prefers_explicit_slug() {
        let input = CreateArticleInput::new(1, "Some Title").with_slug("Custom Slug");
        assert_eq!(input.resolved_slug(), "custom-slug");

        let input = CreateArticleInput::new(1, "Some Title").with_slug("  ");
        assert_eq!(input.resolved_slug(), "some-title");
    }

    #[test]
    fn test_tag_list_helpers() {
        assert_eq!(split_tag_list("discuss, rust,webdev"), vec!["discuss", "rust", "webdev"]);
        assert!(split_tag_list("").is_empty());
        assert_eq!(join_tag_list(&["discuss", "rust"]), "discuss, rust");
        assert_eq!(join_tag_list::<&str>(&[]), "");
    }

    #[test]
    fn test_list_params_clamps() {
        let params = ListParams::new(0, 0);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 1);

        let params = ListParams::new(3, 1000);
        assert_eq!(params.per_page, 100);
        assert_eq!(params.offset(), 200);

        let params = ListParams::with_max(2, 50, 30);
        assert_eq!(params.per_page, 30);
        assert_eq!(params.limit(), 30);
    }

    #[test]
    fn test_paged_result_pages() {
        let params = ListParams::new(2, 10);
        let result: PagedResult<i32> = PagedResult::new(vec![1, 2], 12, &params);
        assert_eq!(result.total_pages(), 2);
        assert!(!result.has_next());
        assert!(result.has_prev());

        let empty: PagedResult<i32> = PagedResult::new(vec![], 0, &params);
        assert_eq!(empty.total_pages(), 0);
    }
}
