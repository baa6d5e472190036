//! Data models
//!
//! Database entities (Article, Tag, User, Comment, Reaction) and the value
//! objects the feed and moderation queries are driven by.

mod article;
mod comment;
mod feed;
mod moderation;
mod tag;
mod user;

pub use article::{
    generate_slug, join_tag_list, split_tag_list, Article, CreateArticleInput, ListParams,
    PagedResult, TAG_LIST_SEPARATOR,
};
pub use comment::{
    Comment, CreateCommentInput, CreateReactionInput, Reaction, ReactionCategory, ARTICLE_TYPE,
};
pub use feed::{ActiveThread, FeedParams, FeedType, ThreadsWindow, Timeframe};
pub use moderation::{
    MembersFilter, ModerationArticle, ModerationFeed, ModerationParams, ModerationUser,
};
pub use tag::{normalize_tag_name, Tag, MAX_TAGS_PER_ARTICLE};
pub use user::{CreateUserInput, UpdateUserInput, User};
