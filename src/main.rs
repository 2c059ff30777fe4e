use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gator::app::AppContext;
use gator::cli::{commands, Cli, Commands};
use gator::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply_overrides(&mut config);

    init_tracing(config.aggregator.log_file.as_deref())?;

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Add { name, url } => {
            commands::add_feed(&ctx, &name, &url)?;
        }
        Commands::Remove { url } => {
            commands::remove_feed(&ctx, &url)?;
        }
        Commands::Feeds => {
            commands::list_feeds(&ctx)?;
        }
        Commands::Follow { url } => {
            commands::follow_feed(&ctx, &url)?;
        }
        Commands::Unfollow { feed } => {
            commands::unfollow_feed(&ctx, &feed)?;
        }
        Commands::Following => {
            commands::list_following(&ctx)?;
        }
        Commands::Aggregate { once, .. } => {
            commands::aggregate(&ctx, once).await?;
        }
        Commands::Browse { limit } => {
            commands::browse(&ctx, limit)?;
        }
        Commands::Open { post } => {
            commands::open_post(&ctx, &post)?;
        }
        Commands::Bookmark { post } => {
            commands::bookmark_post(&ctx, &post)?;
        }
        Commands::Bookmarks => {
            commands::list_bookmarks(&ctx)?;
        }
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(file_layer)
        .with(filter)
        .init();
    Ok(())
}
