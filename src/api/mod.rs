//! API layer - HTTP handlers and routing
//!
//! Every endpoint lives under `/api/v1`:
//! - Feed and active-thread endpoints
//! - Moderation inbox
//! - Article, user, comment and reaction writes (each enqueues a cache bust)
//! - Health check

pub mod articles;
pub mod comments;
pub mod common;
pub mod feed;
pub mod health;
pub mod middleware;
pub mod moderation;
pub mod responses;
pub mod users;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::{
    CommentRepositoryImpl, SqlxArticleRepository, SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::jobs::{CacheBustHandler, JobQueue, JobWorkers};
use crate::services::{
    ActiveThreadsQuery, ArticleService, CommentService, FeedService, ModerationService,
    TagService, UserService,
};

pub use middleware::{ApiError, AppState, RequestStats};

/// Wire repositories, services and the job queue into an [`AppState`].
///
/// Spawns the job workers, so this must run inside a Tokio runtime. The
/// workers stop once every clone of the state has been dropped.
pub fn build_state(pool: DynDatabasePool, cache: Arc<Cache>, config: &Config) -> (AppState, JobWorkers) {
    let article_repo = SqlxArticleRepository::boxed(pool.clone());
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let tag_repo = SqlxTagRepository::boxed(pool.clone());
    let comment_repo = CommentRepositoryImpl::boxed(pool.clone());

    let handler = Arc::new(CacheBustHandler::new(
        comment_repo.clone(),
        user_repo.clone(),
        article_repo.clone(),
        cache.clone(),
    ));
    let (jobs, workers) = JobQueue::start(handler, &config.jobs);

    let state = AppState {
        pool,
        feed_service: Arc::new(FeedService::new(article_repo.clone(), cache, &config.feed)),
        threads_query: Arc::new(ActiveThreadsQuery::new(article_repo.clone())),
        moderation_service: Arc::new(ModerationService::new(
            article_repo.clone(),
            user_repo.clone(),
            &config.moderation,
        )),
        article_service: Arc::new(ArticleService::new(article_repo.clone(), user_repo.clone())),
        tag_service: Arc::new(TagService::new(tag_repo, article_repo.clone())),
        comment_service: Arc::new(CommentService::new(comment_repo, article_repo)),
        user_service: Arc::new(UserService::new(user_repo)),
        jobs,
        request_stats: Arc::new(RequestStats::new()),
    };

    (state, workers)
}

/// Build the `/api/v1` router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(feed::router())
        .merge(articles::router())
        .merge(users::router())
        .merge(comments::router())
        .nest("/moderations", moderation::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .nest("/api/v1", build_api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Outermost, so every request is counted
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state))
}
