//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::app::{GatorError, Result};
use crate::domain::{Feed, FeedDocument, Post, PostDraft, RawItem};
use crate::fetcher::Fetcher;
use crate::store::Store;

#[derive(Clone)]
enum Script {
    Respond(FeedDocument),
    Fail(String),
    Hang,
}

/// Fetcher that answers from a per-URL script and records what it was asked.
/// Unscripted URLs return an empty document.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, document: FeedDocument) {
        self.script(url, Script::Respond(document));
    }

    pub fn fail(&self, url: &str, message: &str) {
        self.script(url, Script::Fail(message.to_string()));
    }

    pub fn hang(&self, url: &str) {
        self.script(url, Script::Hang);
    }

    /// Every fetch sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    fn script(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<FeedDocument> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let script = self.scripts.lock().unwrap().get(url).cloned();
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = match script {
            Some(Script::Respond(document)) => Ok(document),
            Some(Script::Fail(message)) => Err(GatorError::Other(message)),
            Some(Script::Hang) => std::future::pending().await,
            None => Ok(FeedDocument::default()),
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// Store wrapper that can be told to fail specific operations.
pub struct FlakyStore<S> {
    inner: S,
    fail_selection: AtomicBool,
    fail_marking: AtomicBool,
    failing_posts: Mutex<HashSet<String>>,
}

impl<S: Store> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_selection: AtomicBool::new(false),
            fail_marking: AtomicBool::new(false),
            failing_posts: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_selection(&self, fail: bool) {
        self.fail_selection.store(fail, Ordering::SeqCst);
    }

    pub fn fail_marking(&self, fail: bool) {
        self.fail_marking.store(fail, Ordering::SeqCst);
    }

    pub fn fail_post(&self, url: &str) {
        self.failing_posts.lock().unwrap().insert(url.to_string());
    }

    fn selection_guard(&self) -> Result<()> {
        if self.fail_selection.load(Ordering::SeqCst) {
            return Err(GatorError::Other("store unavailable".into()));
        }
        Ok(())
    }
}

impl<S: Store> Store for FlakyStore<S> {
    fn next_feeds_to_fetch(&self, limit: usize) -> Result<Vec<Feed>> {
        self.selection_guard()?;
        self.inner.next_feeds_to_fetch(limit)
    }

    fn mark_feed_fetched(&self, feed_id: i64, fetched_at: DateTime<Utc>) -> Result<()> {
        if self.fail_marking.load(Ordering::SeqCst) {
            return Err(GatorError::Other("mark failed".into()));
        }
        self.inner.mark_feed_fetched(feed_id, fetched_at)
    }

    fn create_post(&self, draft: &PostDraft) -> Result<Post> {
        if self.failing_posts.lock().unwrap().contains(&draft.url) {
            return Err(GatorError::Other(format!("insert failed: {}", draft.url)));
        }
        self.inner.create_post(draft)
    }

    fn count_followed_feeds(&self) -> Result<usize> {
        self.selection_guard()?;
        self.inner.count_followed_feeds()
    }

    fn add_feed(&self, feed: &Feed) -> Result<i64> {
        self.inner.add_feed(feed)
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        self.inner.get_feed(id)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        self.inner.get_feed_by_url(url)
    }

    fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        self.inner.get_all_feeds()
    }

    fn delete_feed(&self, id: i64) -> Result<()> {
        self.inner.delete_feed(id)
    }

    fn follow_feed(&self, user_id: i64, feed_id: i64) -> Result<()> {
        self.inner.follow_feed(user_id, feed_id)
    }

    fn unfollow_feed(&self, user_id: i64, url_or_name: &str) -> Result<bool> {
        self.inner.unfollow_feed(user_id, url_or_name)
    }

    fn get_followed_feeds(&self, user_id: i64) -> Result<Vec<Feed>> {
        self.inner.get_followed_feeds(user_id)
    }

    fn get_post(&self, url_or_title: &str) -> Result<Option<Post>> {
        self.inner.get_post(url_or_title)
    }

    fn get_posts_by_feed(&self, feed_id: i64) -> Result<Vec<Post>> {
        self.inner.get_posts_by_feed(feed_id)
    }

    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<Post>> {
        self.inner.get_posts_for_user(user_id, limit)
    }

    fn bookmark_post(&self, user_id: i64, post_id: i64) -> Result<bool> {
        self.inner.bookmark_post(user_id, post_id)
    }

    fn get_bookmarked_posts(&self, user_id: i64) -> Result<Vec<Post>> {
        self.inner.get_bookmarked_posts(user_id)
    }
}

/// A document with one item per link.
pub fn document(links: &[&str]) -> FeedDocument {
    FeedDocument {
        title: "Scripted".into(),
        link: "https://scripted.example/".into(),
        description: "Scripted feed".into(),
        items: links
            .iter()
            .enumerate()
            .map(|(i, link)| RawItem {
                title: Some(format!("Post {}", i + 1)),
                link: link.to_string(),
                description: Some(format!("Summary of post {}", i + 1)),
                pub_date: Some("Mon, 02 Jan 2006 15:04:05 MST".into()),
            })
            .collect(),
    }
}

/// Add `n` feeds followed by user 1.
pub fn followed_feeds<S: Store + ?Sized>(store: &S, n: usize) -> Vec<Feed> {
    (0..n)
        .map(|i| {
            let mut feed = Feed::new(
                format!("Feed {i}"),
                format!("https://feed{i}.example/rss"),
                1,
            );
            feed.id = store.add_feed(&feed).unwrap();
            store.follow_feed(1, feed.id).unwrap();
            feed
        })
        .collect()
}
