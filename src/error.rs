//! Error handling for the church site client

use std::fmt;
use thiserror::Error;

use church_auth::{AuthError, StorageError};
use church_postgrest::PostgrestError;

/// Unified error type for the church site client
#[derive(Error, Debug)]
pub enum Error {
    /// Sign-in, sign-out and session cache errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Table reads and inserts
    #[error("Database error: {0}")]
    Database(#[from] PostgrestError),

    /// Persisted client state
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Network errors outside the database and auth clients
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Translation documents that could not be loaded
    #[error("Translation error: {0}")]
    Translation(String),

    /// Payment producer failures
    #[error("Payment error: {0}")]
    Payment(String),

    #[error("{0}")]
    General(String),
}

impl Error {
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    pub fn translation<T: fmt::Display>(msg: T) -> Self {
        Error::Translation(msg.to_string())
    }

    pub fn payment<T: fmt::Display>(msg: T) -> Self {
        Error::Payment(msg.to_string())
    }

    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// The most specific message the server (or we) can show a visitor
    pub fn user_message(&self) -> Option<String> {
        match self {
            Error::Database(e) => e.user_message().map(str::to_string),
            Error::Auth(AuthError::AuthenticationError(m)) | Error::Auth(AuthError::ApiError(m))
                if !m.is_empty() =>
            {
                Some(m.clone())
            }
            Error::Payment(m) => Some(m.clone()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
