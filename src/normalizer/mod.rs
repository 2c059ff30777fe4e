pub mod timestamp;

use chrono::{DateTime, Utc};

use crate::app::{GatorError, Result};
use crate::domain::{PostDraft, RawItem};

pub use timestamp::{parse_timestamp, TimestampFormat, ACCEPTED_FORMATS};

/// Turns raw feed items into post drafts.
#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Build a draft for `item`. Only a missing link is an error; an
    /// unparsable timestamp or a markup description just leaves that field
    /// unset.
    pub fn normalize(
        &self,
        feed_id: i64,
        item: &RawItem,
        fetched_at: DateTime<Utc>,
    ) -> Result<PostDraft> {
        if item.link.trim().is_empty() {
            return Err(GatorError::MissingLink);
        }

        let published_at = item.pub_date.as_deref().and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() && !raw.trim().is_empty() {
                tracing::warn!(
                    "Couldn't parse publication time {:?} for post '{}'",
                    raw,
                    item.title.as_deref().unwrap_or(&item.link)
                );
            }
            parsed
        });

        Ok(PostDraft {
            feed_id,
            title: item.title.clone(),
            url: item.link.clone(),
            description: prose_description(item.description.as_deref()),
            published_at,
            fetched_at,
        })
    }
}

/// Some feeds put raw HTML in `description` instead of a summary.
pub fn is_markup(text: &str) -> bool {
    text.contains('<') && text.contains('>')
}

fn prose_description(description: Option<&str>) -> Option<String> {
    match description {
        Some(text) if !is_markup(text) => Some(text.to_string()),
        _ => None,
    }
}
