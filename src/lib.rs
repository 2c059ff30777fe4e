//! # gator
//!
//! A feed aggregator: follow RSS/Atom feeds and collect their posts into a
//! local database on a fixed interval.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler → BatchSelector → WorkerPool → Fetcher → Normalizer → Store
//! ```
//!
//! Every interval the scheduler asks the store for the followed feeds that
//! have gone longest without a fetch, then drains that batch with a pool of
//! workers. Each feed is fetched under its own deadline, marked fetched, and
//! its items are normalized and stored as posts.
//!
//! ## Quick Start
//!
//! ```bash
//! # Add and follow a feed
//! gator add "Rust Blog" https://blog.rust-lang.org/feed.xml
//!
//! # Collect posts every minute until Ctrl-C
//! gator aggregate --interval 1m --log
//!
//! # Show the two latest posts
//! gator browse
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// config, store, fetcher, normalizer and aggregator.
pub mod app;

/// Configuration loaded from `~/.config/gator/config.toml`.
pub mod config;

/// Background aggregation.
///
/// - [`Aggregator`](daemon::Aggregator): start/stop controller, one loop per process
/// - [`Scheduler`](daemon::Scheduler): repeating timer driving cycles
/// - [`BatchSelector`](daemon::BatchSelector): picks the most overdue feeds
pub mod daemon;

/// Command-line interface using clap.
pub mod cli;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): a followed source
/// - [`Post`](domain::Post) / [`PostDraft`](domain::PostDraft): stored items
/// - [`FeedDocument`](domain::FeedDocument): a decoded response
pub mod domain;

/// Feed fetching and the per-cycle worker pool.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`WorkerPool`](fetcher::parallel::WorkerPool): drains one batch with N workers
pub mod fetcher;

/// Turns raw feed items into post drafts.
pub mod normalizer;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

#[cfg(test)]
mod testing;
