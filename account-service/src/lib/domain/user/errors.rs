use thiserror::Error;

use crate::domain::user::models::UserId;

/// Required registration fields that were absent or empty
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Missing required field(s): {}", .fields.join(", "))]
pub struct MissingFieldsError {
    pub fields: Vec<&'static str>,
}

/// Top-level error for all user-related operations
#[derive(Debug, Clone, Error)]
pub enum UserError {
    // Request validation errors
    #[error(transparent)]
    MissingFields(#[from] MissingFieldsError),

    // Domain-level errors
    #[error("Email not registered")]
    EmailNotRegistered,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found: {0}")]
    NotFound(UserId),

    // Infrastructure errors
    #[error("Password error: {0}")]
    Password(#[from] auth::PasswordError),

    #[error("Token error: {0}")]
    Token(#[from] auth::JwtError),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<tokio::task::JoinError> for UserError {
    fn from(err: tokio::task::JoinError) -> Self {
        UserError::Unknown(format!("Blocking task failed: {}", err))
    }
}
