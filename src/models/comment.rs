//! Comment and reaction models
//!
//! Both attach to a polymorphic target identified by `(type, id)`. Only
//! articles are stored targets here, named by [`ARTICLE_TYPE`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Target type name stored for article comments and reactions
pub const ARTICLE_TYPE: &str = "Article";

/// Comment entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub commentable_id: i64,
    pub commentable_type: String,
    pub user_id: i64,
    pub body_markdown: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for commenting on an article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentInput {
    /// Article being commented on
    pub commentable_id: i64,
    pub user_id: i64,
    pub body_markdown: String,
}

/// Reaction category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionCategory {
    Like,
    Unicorn,
    Readinglist,
    Thumbsup,
    Thumbsdown,
    Vomit,
}

impl ReactionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionCategory::Like => "like",
            ReactionCategory::Unicorn => "unicorn",
            ReactionCategory::Readinglist => "readinglist",
            ReactionCategory::Thumbsup => "thumbsup",
            ReactionCategory::Thumbsdown => "thumbsdown",
            ReactionCategory::Vomit => "vomit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "like" => Some(ReactionCategory::Like),
            "unicorn" => Some(ReactionCategory::Unicorn),
            "readinglist" => Some(ReactionCategory::Readinglist),
            "thumbsup" => Some(ReactionCategory::Thumbsup),
            "thumbsdown" => Some(ReactionCategory::Thumbsdown),
            "vomit" => Some(ReactionCategory::Vomit),
            _ => None,
        }
    }

    /// Moderator-only categories
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            ReactionCategory::Thumbsup | ReactionCategory::Thumbsdown | ReactionCategory::Vomit
        )
    }
}

/// Reaction entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: i64,
    pub user_id: i64,
    pub reactable_id: i64,
    pub reactable_type: String,
    pub category: ReactionCategory,
    pub points: f64,
    pub created_at: DateTime<Utc>,
}

/// Input for reacting to an article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReactionInput {
    pub user_id: i64,
    /// Article being reacted to
    pub reactable_id: i64,
    pub category: ReactionCategory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_category_parse() {
        assert_eq!(ReactionCategory::parse("Vomit"), Some(ReactionCategory::Vomit));
        assert_eq!(ReactionCategory::parse(" like "), Some(ReactionCategory::Like));
        assert_eq!(ReactionCategory::parse("hooray"), None);
        for category in [
            ReactionCategory::Like,
            ReactionCategory::Unicorn,
            ReactionCategory::Readinglist,
            ReactionCategory::Thumbsup,
            ReactionCategory::Thumbsdown,
            ReactionCategory::Vomit,
        ] {
            assert_eq!(ReactionCategory::parse(category.as_str()), Some(category));
        }
    }

    #[test]
    fn test_privileged_categories() {
        assert!(ReactionCategory::Vomit.is_privileged());
        assert!(!ReactionCategory::Like.is_privileged());
    }
}
