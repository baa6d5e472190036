//! User service
//!
//! Registration and profile updates. Profile changes leave stale
//! `user-<id>/*` fragments behind, so callers follow a successful update
//! with a user cache bust.

use crate::db::repositories::UserRepository;
use crate::models::{CreateUserInput, UpdateUserInput, User};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9_]{2,30}$").expect("username pattern is valid")
});

const MAX_NAME_LENGTH: usize = 100;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn register(&self, input: &CreateUserInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_lowercase();
        if !USERNAME_RE.is_match(&username) {
            return Err(UserServiceError::ValidationError(
                "Username must be 2-30 lowercase letters, digits or underscores".to_string(),
            ));
        }
        let name = validate_name(&input.name)?;

        if self.repo.get_by_username(&username).await?.is_some() {
            return Err(UserServiceError::UsernameTaken(username));
        }

        let user = self.repo.create(&CreateUserInput::new(username, name)).await?;
        tracing::info!(user_id = user.id, username = %user.username, "Registered user");
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> Result<User, UserServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(id.to_string()))
    }

    pub async fn update(&self, id: i64, input: &UpdateUserInput) -> Result<User, UserServiceError> {
        let input = UpdateUserInput {
            name: input.name.as_deref().map(validate_name).transpose()?,
        };

        self.repo
            .update(id, &input)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(id.to_string()))
    }
}

fn validate_name(name: &str) -> Result<String, UserServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Name cannot exceed {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}
