pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Feed, Post, PostDraft};

pub use sqlite::SqliteStore;

/// Persistence used by the aggregator and the command layer.
///
/// Implementations must tolerate concurrent calls from several workers; the
/// aggregator adds no locking of its own around the store.
pub trait Store {
    // Aggregation
    fn next_feeds_to_fetch(&self, limit: usize) -> Result<Vec<Feed>>;
    fn mark_feed_fetched(&self, feed_id: i64, fetched_at: DateTime<Utc>) -> Result<()>;
    fn create_post(&self, draft: &PostDraft) -> Result<Post>;
    fn count_followed_feeds(&self) -> Result<usize>;

    // Feed operations
    fn add_feed(&self, feed: &Feed) -> Result<i64>;
    fn get_feed(&self, id: i64) -> Result<Option<Feed>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn get_all_feeds(&self) -> Result<Vec<Feed>>;
    fn delete_feed(&self, id: i64) -> Result<()>;

    // Follow operations
    fn follow_feed(&self, user_id: i64, feed_id: i64) -> Result<()>;
    fn unfollow_feed(&self, user_id: i64, url_or_name: &str) -> Result<bool>;
    fn get_followed_feeds(&self, user_id: i64) -> Result<Vec<Feed>>;

    // Post operations
    fn get_post(&self, url_or_title: &str) -> Result<Option<Post>>;
    fn get_posts_by_feed(&self, feed_id: i64) -> Result<Vec<Post>>;
    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<Post>>;

    // Bookmarks
    /// Returns false when the post was already bookmarked.
    fn bookmark_post(&self, user_id: i64, post_id: i64) -> Result<bool>;
    fn get_bookmarked_posts(&self, user_id: i64) -> Result<Vec<Post>>;
}
