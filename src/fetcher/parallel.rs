use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::app::{GatorError, Result};
use crate::domain::Feed;
use crate::fetcher::queue::FeedQueue;
use crate::fetcher::sync::{sync_feed, SyncSummary};
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::store::Store;

/// Result of processing one feed during a cycle.
#[derive(Debug)]
pub struct FeedOutcome {
    pub worker: usize,
    pub feed_id: i64,
    pub url: String,
    pub elapsed: Duration,
    pub result: Result<SyncSummary>,
}

impl FeedOutcome {
    pub fn timed_out(&self) -> bool {
        matches!(&self.result, Err(e) if e.is_timeout())
    }
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub workers: usize,
    pub elapsed: Duration,
    pub outcomes: Vec<FeedOutcome>,
}

impl CycleReport {
    pub fn feeds(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn timed_out(&self) -> usize {
        self.outcomes.iter().filter(|o| o.timed_out()).count()
    }

    pub fn failed(&self) -> usize {
        self.feeds() - self.succeeded() - self.timed_out()
    }

    pub fn posts_stored(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|s| s.posts_stored)
            .sum()
    }
}

/// Drains one batch of feeds with a fixed number of concurrent workers.
pub struct WorkerPool<S> {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    store: Arc<S>,
    normalizer: Normalizer,
    logging: bool,
}

impl<S: Store + Send + Sync + 'static> WorkerPool<S> {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        store: Arc<S>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            fetcher,
            store,
            normalizer,
            logging: false,
        }
    }

    /// Log per-feed progress at info level.
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Process every feed in `feeds` at most once and return after all
    /// workers have exited.
    ///
    /// `workers` is clamped to `1..=feeds.len()`. Each feed gets its own
    /// `feed_timeout` covering fetch, marking and item storage; a feed that
    /// runs out of time is abandoned for this cycle and left unmarked.
    pub async fn run_cycle(
        &self,
        feeds: Vec<Feed>,
        workers: usize,
        feed_timeout: Duration,
    ) -> CycleReport {
        let started = Instant::now();
        if feeds.is_empty() {
            return CycleReport::default();
        }

        let workers = workers.clamp(1, feeds.len());
        let queue = Arc::new(FeedQueue::new(feeds));

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let task = Worker {
                    id: worker,
                    queue: queue.clone(),
                    fetcher: self.fetcher.clone(),
                    store: self.store.clone(),
                    normalizer: self.normalizer.clone(),
                    feed_timeout,
                    logging: self.logging,
                };
                tokio::spawn(task.run())
            })
            .collect();

        let mut outcomes = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok(mut finished) => outcomes.append(&mut finished),
                Err(e) => tracing::error!("Task join error: {}", e),
            }
        }

        CycleReport {
            workers,
            elapsed: started.elapsed(),
            outcomes,
        }
    }
}

struct Worker<S> {
    id: usize,
    queue: Arc<FeedQueue>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    store: Arc<S>,
    normalizer: Normalizer,
    feed_timeout: Duration,
    logging: bool,
}

impl<S: Store + Send + Sync + 'static> Worker<S> {
    async fn run(self) -> Vec<FeedOutcome> {
        let mut outcomes = Vec::new();

        while let Some(feed) = self.queue.pop() {
            let started = Instant::now();
            let result = tokio::time::timeout(
                self.feed_timeout,
                sync_feed(self.fetcher.as_ref(), self.store.as_ref(), &self.normalizer, &feed),
            )
            .await
            .unwrap_or(Err(GatorError::Timeout(self.feed_timeout)));

            let outcome = FeedOutcome {
                worker: self.id,
                feed_id: feed.id,
                url: feed.url,
                elapsed: started.elapsed(),
                result,
            };
            self.report(&outcome);
            outcomes.push(outcome);
        }

        outcomes
    }

    fn report(&self, outcome: &FeedOutcome) {
        match &outcome.result {
            Ok(summary) => {
                if self.logging {
                    tracing::info!(
                        "[Worker {}] Fetched '{}' in {:?}: {} new posts",
                        self.id,
                        outcome.url,
                        outcome.elapsed,
                        summary.posts_stored
                    );
                }
            }
            Err(GatorError::Timeout(limit)) => {
                if self.logging {
                    tracing::warn!(
                        "[Worker {}] Timed out fetching '{}' after {:?}",
                        self.id,
                        outcome.url,
                        limit
                    );
                }
            }
            Err(e) => {
                tracing::warn!("[Worker {}] Failed to fetch '{}': {}", self.id, outcome.url, e);
            }
        }
    }
}
