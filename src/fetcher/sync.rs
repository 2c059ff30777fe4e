use chrono::Utc;

use crate::app::Result;
use crate::domain::Feed;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::store::Store;

/// What happened to the items of one successfully fetched feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub posts_stored: usize,
    pub posts_failed: usize,
    pub items_skipped: usize,
}

/// Fetch one feed, mark it fetched, then store its items.
///
/// The feed is marked before any item is written, with the time the fetch
/// started. A fetch or marking failure aborts the feed; a failure on a single
/// item is logged and the remaining items are still processed.
pub async fn sync_feed<S>(
    fetcher: &(dyn Fetcher + Send + Sync),
    store: &S,
    normalizer: &Normalizer,
    feed: &Feed,
) -> Result<SyncSummary>
where
    S: Store + ?Sized,
{
    let started_at = Utc::now();
    let document = fetcher.fetch_feed(&feed.url).await?;

    store.mark_feed_fetched(feed.id, started_at)?;

    let mut summary = SyncSummary::default();
    for item in &document.items {
        let draft = match normalizer.normalize(feed.id, item, started_at) {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(
                    "Skipping item '{}' from {}: {}",
                    item.title.as_deref().unwrap_or("(untitled)"),
                    feed.url,
                    e
                );
                summary.items_skipped += 1;
                continue;
            }
        };

        match store.create_post(&draft) {
            Ok(_) => summary.posts_stored += 1,
            Err(e) => {
                tracing::warn!("Failed to save post '{}': {}", draft.url, e);
                summary.posts_failed += 1;
            }
        }

        // Give the per-feed deadline a chance to fire on very long feeds.
        tokio::task::yield_now().await;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::GatorError;
    use crate::domain::RawItem;
    use crate::store::SqliteStore;
    use crate::testing::{document, followed_feeds, FlakyStore, ScriptedFetcher};

    #[tokio::test]
    async fn test_sync_stores_items_and_marks_feed() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = followed_feeds(&store, 1).remove(0);
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&feed.url, document(&["https://a/1", "https://a/2"]));

        let summary = sync_feed(&fetcher, &store, &Normalizer::new(), &feed)
            .await
            .unwrap();
        assert_eq!(summary.posts_stored, 2);
        assert_eq!(summary.posts_failed, 0);

        let marked = store.get_feed(feed.id).unwrap().unwrap();
        let fetched_at = marked.last_fetched_at.unwrap();
        let posts = store.get_posts_by_feed(feed.id).unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| p.created_at == fetched_at));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_feed_unmarked() {
        let store = SqliteStore::in_memory().unwrap();
        let feed = followed_feeds(&store, 1).remove(0);
        let fetcher = ScriptedFetcher::new();
        fetcher.fail(&feed.url, "connection refused");

        let err = sync_feed(&fetcher, &store, &Normalizer::new(), &feed)
            .await
            .unwrap_err();
        assert!(matches!(err, GatorError::Other(_)));

        let unchanged = store.get_feed(feed.id).unwrap().unwrap();
        assert!(unchanged.last_fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_mark_failure_aborts_item_processing() {
        let inner = SqliteStore::in_memory().unwrap();
        let feed = followed_feeds(&inner, 1).remove(0);
        let store = FlakyStore::new(inner);
        store.fail_marking(true);

        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&feed.url, document(&["https://a/1"]));

        assert!(sync_feed(&fetcher, &store, &Normalizer::new(), &feed)
            .await
            .is_err());
        assert!(store.get_posts_by_feed(feed.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_item_failures_do_not_abort_feed() {
        let inner = SqliteStore::in_memory().unwrap();
        let feed = followed_feeds(&inner, 1).remove(0);
        let store = FlakyStore::new(inner);
        store.fail_post("https://a/2");

        let mut doc = document(&["https://a/1", "https://a/2", "https://a/3"]);
        doc.items.push(RawItem {
            title: Some("no link".into()),
            ..Default::default()
        });
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&feed.url, doc);

        let summary = sync_feed(&fetcher, &store, &Normalizer::new(), &feed)
            .await
            .unwrap();
        assert_eq!(
            summary,
            SyncSummary {
                posts_stored: 2,
                posts_failed: 1,
                items_skipped: 1,
            }
        );

        let urls: Vec<String> = store
            .get_posts_by_feed(feed.id)
            .unwrap()
            .into_iter()
            .map(|p| p.url)
            .collect();
        assert_eq!(urls, vec!["https://a/1", "https://a/3"]);
    }
}
