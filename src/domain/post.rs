use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized item that has not been written to the store yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    pub feed_id: i64,
    pub title: Option<String>,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Start time of the fetch that produced this draft; becomes the post's
    /// `created_at` and `updated_at`.
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub title: Option<String>,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => "(Untitled)",
        }
    }

    /// Publication time if the feed provided a usable one, otherwise the time
    /// the post was stored.
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.updated_at)
    }
}
