pub mod document;
pub mod http_fetcher;
pub mod parallel;
pub mod queue;
pub mod sync;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::FeedDocument;

#[async_trait]
pub trait Fetcher {
    /// Download and decode the feed at `url`.
    ///
    /// Callers bound this with their own deadline by dropping the future, so
    /// implementations must not hand work off to detached tasks.
    async fn fetch_feed(&self, url: &str) -> Result<FeedDocument>;
}
