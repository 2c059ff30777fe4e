use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatorError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Aggregation already running")]
    AlreadyRunning,

    #[error("Feed item has no link")]
    MissingLink,

    #[error("{0}")]
    Other(String),
}

impl GatorError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatorError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, GatorError>;
