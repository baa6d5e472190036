//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Unique handle, also the first segment of article paths
    pub username: String,
    /// Display name
    pub name: String,
    /// Number of published articles
    pub articles_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Profile path, `/<username>`
    pub fn path(&self) -> String {
        format!("/{}", self.username)
    }
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    pub name: String,
}

impl CreateUserInput {
    pub fn new(username: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            name: name.into(),
        }
    }
}

/// Input for updating a user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserInput {
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_path() {
        let now = Utc::now();
        let user = User {
            id: 7,
            username: "ada".to_string(),
            name: "Ada".to_string(),
            articles_count: 0,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(user.path(), "/ada");
    }
}
