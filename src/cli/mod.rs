pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{parse_duration, Config};

#[derive(Parser)]
#[command(name = "gator")]
#[command(about = "A feed aggregator", long_about = None, version)]
pub struct Cli {
    /// Config file (default: ~/.config/gator/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a feed and follow it
    Add {
        /// Display name for the feed
        name: String,
        /// URL of the feed
        url: String,
    },
    /// Delete a feed along with its posts
    Remove {
        /// URL of the feed to remove
        url: String,
    },
    /// List all feeds
    Feeds,
    /// Follow an existing feed
    Follow {
        /// URL of the feed to follow
        url: String,
    },
    /// Stop following a feed
    Unfollow {
        /// URL or name of the feed
        feed: String,
    },
    /// List followed feeds
    Following,
    /// Fetch followed feeds on an interval until interrupted
    Aggregate {
        /// Time between cycles (e.g., "30s", "1m", "1h")
        #[arg(short, long, value_parser = parse_duration)]
        interval: Option<std::time::Duration>,

        /// Maximum concurrent workers per cycle
        #[arg(short, long)]
        workers: Option<usize>,

        /// Log cycle and per-feed progress
        #[arg(long)]
        log: bool,

        /// Also write logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Show the latest posts from followed feeds
    Browse {
        /// Number of posts to show
        #[arg(default_value_t = 2)]
        limit: usize,
    },
    /// Open a stored post in the browser
    Open {
        /// URL or title of the post
        post: String,
    },
    /// Bookmark a stored post
    Bookmark {
        /// URL or title of the post
        post: String,
    },
    /// List bookmarked posts
    Bookmarks,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Commands::Aggregate {
            interval,
            workers,
            log,
            log_file,
            ..
        } = &self.command
        {
            if let Some(interval) = interval {
                config.aggregator.interval = *interval;
            }
            if workers.is_some() {
                config.aggregator.workers = *workers;
            }
            if *log {
                config.aggregator.logging = true;
            }
            if log_file.is_some() {
                config.aggregator.log_file = log_file.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_aggregate_overrides_config() {
        let cli = Cli::parse_from([
            "gator",
            "aggregate",
            "--interval",
            "1m30s",
            "--workers",
            "4",
            "--log",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.aggregator.interval, Duration::from_secs(90));
        assert_eq!(config.aggregator.workers, Some(4));
        assert!(config.aggregator.logging);
        assert_eq!(config.aggregator.log_file, None);
    }

    #[test]
    fn test_other_commands_leave_config_alone() {
        let cli = Cli::parse_from(["gator", "browse"]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.aggregator.interval, Duration::from_secs(60));
        assert!(matches!(cli.command, Commands::Browse { limit: 2 }));
    }

    #[test]
    fn test_bookmark_takes_title_or_url() {
        let cli = Cli::parse_from(["gator", "bookmark", "Hello, world"]);
        assert!(matches!(cli.command, Commands::Bookmark { post } if post == "Hello, world"));
    }

    #[test]
    fn test_invalid_interval_is_rejected() {
        assert!(Cli::try_parse_from(["gator", "aggregate", "--interval", "soon"]).is_err());
    }
}
