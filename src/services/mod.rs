//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories:
//! - Composing feed and moderation queries from request parameters
//! - Validating writes and keeping denormalized columns consistent
//! - Owning the cache key scheme and busting stale fragments

pub mod active_threads;
pub mod article;
pub mod cache_bust;
pub mod comment;
pub mod feed;
pub mod moderation;
pub mod tag;
pub mod user;

pub use active_threads::ActiveThreadsQuery;
pub use article::{ArticleService, ArticleServiceError};
pub use cache_bust::{fragment_key, CacheBuster};
pub use comment::{CommentService, CommentServiceError};
pub use feed::{FeedService, FeedServiceError, TagStrategy};
pub use moderation::{ModerationService, ModerationServiceError};
pub use tag::{clean_tag_names, TagService, TagServiceError};
pub use user::{UserService, UserServiceError};
