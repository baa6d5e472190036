//! Tag model

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum number of tags one article may carry
pub const MAX_TAGS_PER_ARTICLE: usize = 4;

static TAG_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]{1,30}$").expect("tag name pattern is valid")
});

/// Tag entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    /// Unique, lowercase alphanumeric name
    pub name: String,
    /// Whether the tag appears in public tag lists
    pub supported: bool,
    pub created_at: DateTime<Utc>,
}

/// Normalize a user-supplied tag name.
///
/// Trims whitespace, drops a leading `#` and lowercases. Returns `None` when
/// the result is not a well-formed tag name; callers treat that as "no tag".
pub fn normalize_tag_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let name = trimmed.to_lowercase();
    TAG_NAME_RE.is_match(&name).then_some(name)
}
