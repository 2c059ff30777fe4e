use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    /// User that added the feed
    pub user_id: i64,
    /// `None` until the first successful fetch
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feed {
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: name.into(),
            url: url.into(),
            user_id,
            last_fetched_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }
}
