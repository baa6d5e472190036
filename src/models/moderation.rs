//! Moderation inbox value objects and the JSON projection handed to the
//! moderation UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Article, User};

/// Which slice of the candidate set a moderator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationFeed {
    /// Only articles the moderator has not reacted to yet
    #[default]
    Inbox,
    /// Everything in the candidate set, reacted or not
    All,
}

impl ModerationFeed {
    /// Unknown or missing values fall back to the inbox
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("all") => ModerationFeed::All,
            _ => ModerationFeed::Inbox,
        }
    }
}

/// Author tenure filter, based on `nth_published_by_author`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembersFilter {
    /// First to third published article
    New,
    /// Fourth published article or later
    NotNew,
}

impl MembersFilter {
    /// Highest `nth_published_by_author` that still counts as a new member
    pub const NEW_MEMBER_MAX_NTH: i32 = 3;

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "new" => Some(MembersFilter::New),
            "not_new" | "not-new" => Some(MembersFilter::NotNew),
            _ => None,
        }
    }
}

/// Inbound parameters for the moderation inbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationParams {
    /// The requesting moderator
    pub user_id: i64,
    #[serde(default)]
    pub feed: ModerationFeed,
    #[serde(default)]
    pub members: Option<MembersFilter>,
    /// Raw tag as supplied by the caller
    #[serde(default)]
    pub tag: Option<String>,
    /// Current sub-community; all communities when absent
    #[serde(default)]
    pub community_id: Option<i64>,
}

impl ModerationParams {
    pub fn inbox(user_id: i64) -> Self {
        Self {
            user_id,
            feed: ModerationFeed::Inbox,
            members: None,
            tag: None,
            community_id: None,
        }
    }

    pub fn with_feed(mut self, feed: ModerationFeed) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_members(mut self, members: MembersFilter) -> Self {
        self.members = Some(members);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn in_community(mut self, community_id: i64) -> Self {
        self.community_id = Some(community_id);
        self
    }
}

/// Author sub-object of [`ModerationArticle`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationUser {
    pub username: String,
    pub name: String,
    pub path: String,
    pub articles_count: i64,
    pub id: i64,
}

/// One entry of the moderation inbox; field order is the wire order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationArticle {
    pub id: i64,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub cached_tag_list: String,
    pub path: String,
    pub nth_published_by_author: i32,
    pub user: ModerationUser,
}

impl ModerationArticle {
    pub fn new(article: Article, user: &User) -> Self {
        Self {
            id: article.id,
            title: article.title,
            published_at: article.published_at,
            cached_tag_list: article.cached_tag_list,
            path: article.path,
            nth_published_by_author: article.nth_published_by_author,
            user: ModerationUser {
                username: user.username.clone(),
                name: user.name.clone(),
                path: user.path(),
                articles_count: user.articles_count,
                id: user.id,
            },
        }
    }
}
