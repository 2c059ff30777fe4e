use crate::app::Result;
use crate::domain::Feed;
use crate::store::Store;

/// Upper bound on feeds pulled into a single cycle, whatever the config says.
pub const MAX_BATCH_SIZE: usize = 500;

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Picks the feeds that are most overdue.
#[derive(Debug, Clone, Copy)]
pub struct BatchSelector {
    max_batch_size: usize,
}

impl Default for BatchSelector {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BatchSelector {
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.clamp(1, MAX_BATCH_SIZE),
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Number of distinct followed feeds, capped at the configured maximum.
    pub fn batch_size<S: Store + ?Sized>(&self, store: &S) -> Result<usize> {
        Ok(store.count_followed_feeds()?.min(self.max_batch_size))
    }

    /// Feeds never fetched first, then the oldest fetch, truncated to
    /// `max_count`. An empty result means there is nothing to do.
    pub fn select_batch<S: Store + ?Sized>(
        &self,
        store: &S,
        max_count: usize,
    ) -> Result<Vec<Feed>> {
        if max_count == 0 {
            return Ok(Vec::new());
        }
        store.next_feeds_to_fetch(max_count)
    }

    /// Size the batch from the store, then select it.
    pub fn next_batch<S: Store + ?Sized>(&self, store: &S) -> Result<Vec<Feed>> {
        let size = self.batch_size(store)?;
        self.select_batch(store, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::store::SqliteStore;
    use crate::testing::{followed_feeds, FlakyStore};

    #[test]
    fn test_never_fetched_first_then_oldest() {
        let store = SqliteStore::in_memory().unwrap();
        let feeds = followed_feeds(&store, 5);
        let now = Utc::now();
        store.mark_feed_fetched(feeds[0].id, now - Duration::hours(1)).unwrap();
        store.mark_feed_fetched(feeds[1].id, now - Duration::hours(3)).unwrap();
        store.mark_feed_fetched(feeds[2].id, now - Duration::hours(2)).unwrap();

        let batch = BatchSelector::default().select_batch(&store, 3).unwrap();
        let ids: Vec<i64> = batch.iter().map(|f| f.id).collect();

        assert_eq!(ids.len(), 3);
        let mut first_two = ids[..2].to_vec();
        first_two.sort();
        assert_eq!(first_two, vec![feeds[3].id, feeds[4].id]);
        assert_eq!(ids[2], feeds[1].id);
    }

    #[test]
    fn test_empty_store_selects_nothing() {
        let store = SqliteStore::in_memory().unwrap();
        let selector = BatchSelector::default();
        assert_eq!(selector.batch_size(&store).unwrap(), 0);
        assert!(selector.next_batch(&store).unwrap().is_empty());
        assert!(selector.select_batch(&store, 0).unwrap().is_empty());
    }

    #[test]
    fn test_batch_size_is_capped() {
        let store = SqliteStore::in_memory().unwrap();
        followed_feeds(&store, 4);

        assert_eq!(BatchSelector::new(50).batch_size(&store).unwrap(), 4);
        assert_eq!(BatchSelector::new(3).batch_size(&store).unwrap(), 3);
        assert_eq!(BatchSelector::new(3).next_batch(&store).unwrap().len(), 3);
    }

    #[test]
    fn test_max_batch_size_is_clamped() {
        assert_eq!(BatchSelector::new(0).max_batch_size(), 1);
        assert_eq!(BatchSelector::new(10_000).max_batch_size(), MAX_BATCH_SIZE);
    }

    #[test]
    fn test_selection_errors_propagate() {
        let store = FlakyStore::new(SqliteStore::in_memory().unwrap());
        followed_feeds(&store, 2);
        store.fail_selection(true);

        assert!(BatchSelector::default().next_batch(&store).is_err());
    }
}
