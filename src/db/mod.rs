//! Database layer
//!
//! Persistence for articles, tags, users, comments and reactions on either
//! SQLite (default, single-binary deployment) or MySQL.
//!
//! # Architecture
//!
//! A trait-based pool abstraction (`DatabasePool`) fronts both backends.
//! Repositories dispatch on [`DatabasePool::driver`] to per-driver free
//! functions, and [`query::ArticleScope`] renders composable article
//! queries for whichever driver is configured.
//!
//! # Usage
//!
//! ```ignore
//! use agora::config::DatabaseConfig;
//! use agora::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod query;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
pub use query::{ArticleFilter, ArticleOrder, ArticleScope, SqlValue};
