//! Feed service
//!
//! Composes the article feed from a parameter bag:
//! - `latest`: recency-sorted with a score floor
//! - rolling windows (`day`..`infinity`): score-sorted within the window
//! - anything else: score-sorted over the whole base set
//!
//! Invalid filter values never raise. An unknown timeframe means "no
//! window" and a malformed tag means "no tag filter".
//!
//! Finished pages are cached under `feed:*` keys for a short TTL; article
//! mutations bust the whole prefix.

use crate::cache::{Cache, CacheLayer};
use crate::config::FeedConfig;
use crate::db::query::{ArticleFilter, ArticleOrder, ArticleScope};
use crate::db::repositories::ArticleRepository;
use crate::models::{normalize_tag_name, Article, FeedParams, ListParams, PagedResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Cache key prefix for finished feed pages
pub const CACHE_KEY_FEED: &str = "feed:";

/// Error types for feed service operations
#[derive(Debug, thiserror::Error)]
pub enum FeedServiceError {
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// How a tag constraint is expressed in SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStrategy {
    /// Match against the denormalized `cached_tag_list`
    CachedList,
    /// Subquery through `article_tags`
    Join,
}

impl TagStrategy {
    pub fn from_config(config: &FeedConfig) -> Self {
        if config.optimize_tag_query {
            TagStrategy::CachedList
        } else {
            TagStrategy::Join
        }
    }

    fn filter(&self, name: String) -> ArticleFilter {
        match self {
            TagStrategy::CachedList => ArticleFilter::CachedTag(name),
            TagStrategy::Join => ArticleFilter::JoinedTag(name),
        }
    }
}

/// Feed service
pub struct FeedService {
    repo: Arc<dyn ArticleRepository>,
    cache: Arc<Cache>,
    strategy: TagStrategy,
    latest_minimum_score: i64,
    max_per_page: u32,
    cache_ttl: Duration,
}

impl FeedService {
    pub fn new(repo: Arc<dyn ArticleRepository>, cache: Arc<Cache>, config: &FeedConfig) -> Self {
        Self {
            repo,
            cache,
            strategy: TagStrategy::from_config(config),
            latest_minimum_score: config.latest_minimum_score,
            max_per_page: config.max_per_page,
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
        }
    }

    /// Override the tag strategy chosen from configuration
    pub fn with_strategy(mut self, strategy: TagStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> TagStrategy {
        self.strategy
    }

    /// Feed over all published articles, read through the cache
    pub async fn feed(&self, params: &FeedParams) -> Result<PagedResult<Article>, FeedServiceError> {
        // Stores treat a zero TTL as "use the default", so skip them outright
        if self.cache_ttl.is_zero() {
            return self.feed_within(ArticleScope::published(), params).await;
        }

        let cache_key = self.cache_key(params);

        match self.cache.get::<PagedResult<Article>>(&cache_key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => tracing::debug!(key = %cache_key, "Feed cache miss"),
            Err(e) => tracing::warn!(key = %cache_key, "Feed cache read failed: {}", e),
        }

        let result = self.feed_within(ArticleScope::published(), params).await?;

        if let Err(e) = self.cache.set(&cache_key, &result, self.cache_ttl).await {
            tracing::warn!(key = %cache_key, "Feed cache write failed: {}", e);
        }

        Ok(result)
    }

    /// Feed over a caller-chosen base scope; never cached
    pub async fn feed_within(
        &self,
        base: ArticleScope,
        params: &FeedParams,
    ) -> Result<PagedResult<Article>, FeedServiceError> {
        let page = ListParams::with_max(params.page, params.per_page, self.max_per_page);
        let scope = self.compose(base, params, Utc::now());

        let total = self.repo.count(&scope).await?;
        let items = self
            .repo
            .find(&scope.limit(page.limit()).offset(page.offset()))
            .await?;

        Ok(PagedResult::new(items, total, &page))
    }

    /// Build the unpaged scope for `params` relative to `now`
    pub fn compose(&self, base: ArticleScope, params: &FeedParams, now: DateTime<Utc>) -> ArticleScope {
        let mut scope = base;

        if let Some(name) = params.tag.as_deref().and_then(normalize_tag_name) {
            scope = scope.filter(self.strategy.filter(name));
        }

        if params.is_latest() {
            return scope
                .filter(ArticleFilter::ScoreAbove(self.minimum_score(params)))
                .order_by(ArticleOrder::PublishedAtDesc);
        }

        if let Some(cutoff) = params.timeframe.and_then(|tf| tf.cutoff(now)) {
            scope = scope.filter(ArticleFilter::PublishedAfter(cutoff));
        }

        scope.order_by(ArticleOrder::ScoreDesc)
    }

    fn minimum_score(&self, params: &FeedParams) -> i64 {
        params.minimum_score.unwrap_or(self.latest_minimum_score)
    }

    /// `feed:<type>:<timeframe>:<tag>:<page>:<per_page>:<min_score>`
    pub fn cache_key(&self, params: &FeedParams) -> String {
        let page = ListParams::with_max(params.page, params.per_page, self.max_per_page);
        let tag = params.tag.as_deref().and_then(normalize_tag_name);
        format!(
            "{}{}:{}:{}:{}:{}:{}",
            CACHE_KEY_FEED,
            params.feed_type.map(|t| t.as_str()).unwrap_or("default"),
            params.timeframe.map(|tf| tf.as_str()).unwrap_or("none"),
            tag.as_deref().unwrap_or("all"),
            page.page,
            page.per_page,
            self.minimum_score(params),
        )
    }
}
