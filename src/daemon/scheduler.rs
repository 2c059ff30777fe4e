use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::app::Result;
use crate::config::{format_duration, AggregatorConfig};
use crate::daemon::selector::{BatchSelector, DEFAULT_BATCH_SIZE};
use crate::fetcher::parallel::{CycleReport, WorkerPool};
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::store::Store;

/// Shortest interval between cycles. Anything smaller is raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Longest interval between cycles; larger values would overflow the timer.
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 86400);

/// Settings for one run of the aggregation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationParams {
    pub interval: Duration,
    /// Worker cap per cycle; one worker per feed when `None`.
    pub workers: Option<usize>,
    /// Per-feed deadline; the interval when `None`.
    pub feed_timeout: Option<Duration>,
    pub max_batch_size: usize,
    pub logging: bool,
    pub fetch_on_start: bool,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self::new(Duration::from_secs(60), false)
    }
}

impl From<&AggregatorConfig> for AggregationParams {
    fn from(config: &AggregatorConfig) -> Self {
        Self {
            interval: config.interval,
            workers: config.workers,
            feed_timeout: config.feed_timeout,
            max_batch_size: config.max_batch_size,
            logging: config.logging,
            fetch_on_start: config.fetch_on_start,
        }
    }
}

impl AggregationParams {
    pub fn new(interval: Duration, logging: bool) -> Self {
        Self {
            interval,
            workers: None,
            feed_timeout: None,
            max_batch_size: DEFAULT_BATCH_SIZE,
            logging,
            fetch_on_start: false,
        }
    }

    /// Keep the interval within `MIN_INTERVAL..=MAX_INTERVAL` and drop a zero
    /// feed timeout.
    pub fn clamped(mut self) -> Self {
        if self.interval < MIN_INTERVAL {
            tracing::warn!(
                "Interval {} is below the minimum, using {}",
                format_duration(self.interval),
                format_duration(MIN_INTERVAL)
            );
            self.interval = MIN_INTERVAL;
        }
        if self.interval > MAX_INTERVAL {
            tracing::warn!(
                "Interval {} is above the maximum, using {}",
                format_duration(self.interval),
                format_duration(MAX_INTERVAL)
            );
            self.interval = MAX_INTERVAL;
        }
        if let Some(timeout) = self.feed_timeout {
            if timeout.is_zero() {
                tracing::warn!("Feed timeout of 0s ignored, using the interval");
                self.feed_timeout = None;
            }
        }
        self
    }

    pub fn feed_timeout(&self) -> Duration {
        self.feed_timeout.unwrap_or(self.interval)
    }
}

/// Drives aggregation cycles off a repeating timer.
pub struct Scheduler<S> {
    store: Arc<S>,
    pool: WorkerPool<S>,
    selector: BatchSelector,
    params: AggregationParams,
}

impl<S: Store + Send + Sync + 'static> Scheduler<S> {
    pub fn new(
        store: Arc<S>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        normalizer: Normalizer,
        params: AggregationParams,
    ) -> Self {
        let params = params.clamped();
        Self {
            pool: WorkerPool::new(fetcher, store.clone(), normalizer).with_logging(params.logging),
            selector: BatchSelector::new(params.max_batch_size),
            store,
            params,
        }
    }

    /// Select a batch and drain it with the worker pool.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let feeds = self.selector.next_batch(self.store.as_ref())?;
        let workers = self.params.workers.unwrap_or(feeds.len());
        Ok(self
            .pool
            .run_cycle(feeds, workers, self.params.feed_timeout())
            .await)
    }

    /// Run cycles until `stop` reads true or its sender is dropped.
    ///
    /// The stop signal is only acted on between cycles; a cycle that has
    /// started always runs until every worker has exited.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        if self.params.logging {
            tracing::info!(
                "Collecting feeds every {} (up to {} per cycle)",
                format_duration(self.params.interval),
                self.selector.max_batch_size()
            );
        }

        let mut timer = interval(self.params.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !self.params.fetch_on_start {
            // Skip the first immediate tick
            timer.tick().await;
        }

        loop {
            let fired = tokio::select! {
                _ = timer.tick() => true,
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    false
                }
            };

            if *stop.borrow() {
                break;
            }
            if fired {
                self.tick().await;
            }
        }

        if self.params.logging {
            tracing::info!("Aggregation stopped");
        }
    }

    async fn tick(&self) {
        match self.run_cycle().await {
            Ok(report) => {
                if !self.params.logging {
                    return;
                }
                if report.feeds() == 0 {
                    tracing::info!("No feeds to fetch");
                } else {
                    tracing::info!(
                        "Cycle complete: {} feeds, {} workers, {} new posts, {} timed out, {} failed ({:.1}s)",
                        report.feeds(),
                        report.workers,
                        report.posts_stored(),
                        report.timed_out(),
                        report.failed(),
                        report.elapsed.as_secs_f64()
                    );
                }
            }
            Err(e) => {
                if self.params.logging {
                    tracing::error!("Failed to select feeds: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::testing::{document, followed_feeds, FlakyStore, ScriptedFetcher};

    #[test]
    fn test_interval_is_clamped() {
        let params = AggregationParams::new(Duration::from_millis(10), false).clamped();
        assert_eq!(params.interval, MIN_INTERVAL);

        let params = AggregationParams::new(Duration::ZERO, true).clamped();
        assert_eq!(params.interval, MIN_INTERVAL);

        let params = AggregationParams::new(Duration::from_secs(5), false).clamped();
        assert_eq!(params.interval, Duration::from_secs(5));

        let params = AggregationParams::new(Duration::from_secs(u64::MAX), false).clamped();
        assert_eq!(params.interval, MAX_INTERVAL);
    }

    #[test]
    fn test_feed_timeout_defaults_to_interval() {
        let mut params = AggregationParams::new(Duration::from_secs(30), false);
        assert_eq!(params.feed_timeout(), Duration::from_secs(30));

        params.feed_timeout = Some(Duration::from_secs(5));
        assert_eq!(params.feed_timeout(), Duration::from_secs(5));

        params.feed_timeout = Some(Duration::ZERO);
        assert_eq!(params.clamped().feed_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_params_from_config() {
        let config = AggregatorConfig {
            workers: Some(3),
            logging: true,
            ..Default::default()
        };
        let params = AggregationParams::from(&config);
        assert_eq!(params.interval, Duration::from_secs(60));
        assert_eq!(params.workers, Some(3));
        assert!(params.logging);
    }

    #[tokio::test]
    async fn test_run_cycle_fetches_followed_feeds() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let feeds = followed_feeds(store.as_ref(), 3);
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.respond(&feeds[0].url, document(&["https://feed0.example/1"]));

        let scheduler = Scheduler::new(
            store.clone(),
            fetcher.clone(),
            Normalizer::new(),
            AggregationParams::new(Duration::from_secs(60), false),
        );
        let report = scheduler.run_cycle().await.unwrap();

        assert_eq!(report.feeds(), 3);
        assert_eq!(report.workers, 3);
        assert_eq!(report.posts_stored(), 1);
        assert_eq!(fetcher.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_run_cycle_reports_selection_errors() {
        let store = Arc::new(FlakyStore::new(SqliteStore::in_memory().unwrap()));
        followed_feeds(store.as_ref(), 2);
        store.fail_selection(true);
        let fetcher = Arc::new(ScriptedFetcher::new());

        let scheduler = Scheduler::new(
            store.clone(),
            fetcher.clone(),
            Normalizer::new(),
            AggregationParams::new(Duration::from_secs(60), true),
        );
        assert!(scheduler.run_cycle().await.is_err());
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exits_when_sender_dropped() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let scheduler = Scheduler::new(
            store,
            fetcher,
            Normalizer::new(),
            AggregationParams::new(Duration::from_secs(1), false),
        );

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(rx));
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop should exit")
            .unwrap();
    }
}
