//! Error types for Falcon X
//!
//! All errors use thiserror for structured error handling.
//! These errors serialize to a plain message for status output.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {message}")]
    GitHub { status: u16, message: String },

    #[error("GitHub API rate limit exceeded{}", retry_hint(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("Remote file changed since it was read: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Item {id} not found in {catalog}")]
    ItemNotFound { catalog: String, id: i64 },

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Admin session expired")]
    SessionExpired,

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("GitHub username and repository are not configured")]
    NotConfigured,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Generic(String),
}

fn retry_hint(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(". Try again after {} UTC", at.format("%H:%M:%S")),
        None => String::new(),
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
