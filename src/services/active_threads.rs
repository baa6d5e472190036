//! Active discussion threads for the sidebar
//!
//! Articles carrying any of the requested tags (matched on the cached tag
//! list), narrowed by a `time_ago` window. When the narrowed set is empty
//! the query falls back to the tagged set without score or time filters,
//! so the sidebar is never blank while tagged articles exist.

use crate::db::query::{ArticleFilter, ArticleOrder, ArticleScope};
use crate::db::repositories::ArticleRepository;
use crate::models::{normalize_tag_name, ActiveThread, Article, ThreadsWindow};
use crate::services::FeedServiceError;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub const DEFAULT_THREAD_TAG: &str = "discuss";
pub const DEFAULT_THREAD_COUNT: u32 = 10;
pub const MAX_THREAD_COUNT: u32 = 100;

/// Threads scoring below this are hidden unless nothing else matches
pub const THREAD_MINIMUM_SCORE: i64 = -4;

/// Default look-back when no `time_ago` is given
const DEFAULT_WINDOW_DAYS: i64 = 3;

pub struct ActiveThreadsQuery {
    repo: Arc<dyn ArticleRepository>,
}

impl ActiveThreadsQuery {
    pub fn new(repo: Arc<dyn ArticleRepository>) -> Self {
        Self { repo }
    }

    pub async fn call<S: AsRef<str>>(
        &self,
        tags: &[S],
        time_ago: Option<ThreadsWindow>,
        count: Option<u32>,
    ) -> Result<Vec<ActiveThread>, FeedServiceError> {
        self.call_at(tags, time_ago, count, Utc::now()).await
    }

    /// [`ActiveThreadsQuery::call`] with an explicit clock
    pub async fn call_at<S: AsRef<str>>(
        &self,
        tags: &[S],
        time_ago: Option<ThreadsWindow>,
        count: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ActiveThread>, FeedServiceError> {
        let limit = i64::from(count.unwrap_or(DEFAULT_THREAD_COUNT).clamp(1, MAX_THREAD_COUNT));
        let tagged = ArticleScope::published().filter(ArticleFilter::AnyCachedTag(thread_tags(tags)));

        let (narrowed, order) = match time_ago {
            Some(ThreadsWindow::Latest) => (
                tagged.clone().filter(ArticleFilter::ScoreAtLeast(THREAD_MINIMUM_SCORE)),
                ArticleOrder::PublishedAtDesc,
            ),
            Some(ThreadsWindow::Since(at)) => (
                tagged
                    .clone()
                    .filter(ArticleFilter::PublishedSince(at))
                    .filter(ArticleFilter::ScoreAtLeast(THREAD_MINIMUM_SCORE)),
                ArticleOrder::CommentsCountDesc,
            ),
            None => (
                tagged
                    .clone()
                    .filter(ArticleFilter::PublishedSince(now - Duration::days(DEFAULT_WINDOW_DAYS)))
                    .filter(ArticleFilter::ScoreAtLeast(THREAD_MINIMUM_SCORE)),
                ArticleOrder::LastCommentAtDesc,
            ),
        };

        let mut articles = self
            .repo
            .find(&narrowed.order_by(order).limit(limit))
            .await?;

        if articles.is_empty() {
            tracing::debug!("No active threads in window, falling back to all tagged articles");
            articles = self.repo.find(&tagged.order_by(order).limit(limit)).await?;
        }

        Ok(articles.into_iter().map(to_thread).collect())
    }
}

/// Normalized tag names, `discuss` when none are usable
fn thread_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in tags.iter().filter_map(|t| normalize_tag_name(t.as_ref())) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    if names.is_empty() {
        names.push(DEFAULT_THREAD_TAG.to_string());
    }
    names
}

fn to_thread(article: Article) -> ActiveThread {
    ActiveThread {
        path: article.path,
        title: article.title,
        comments_count: article.comments_count,
        created_at: article.created_at,
    }
}
