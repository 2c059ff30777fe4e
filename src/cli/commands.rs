use url::Url;

use crate::app::{AppContext, GatorError, Result};
use crate::config::format_duration;
use crate::domain::{Feed, Post};
use crate::fetcher::parallel::CycleReport;
use crate::store::Store;

/// Feeds are stored under their parsed form, so `https://example.com` and
/// `https://example.com/` name the same feed.
fn normalize_url(url: &str) -> Result<String> {
    Ok(Url::parse(url.trim())?.to_string())
}

pub fn add_feed(ctx: &AppContext, name: &str, url: &str) -> Result<Feed> {
    let url = normalize_url(url)?;

    if let Some(existing) = ctx.store.get_feed_by_url(&url)? {
        ctx.store.follow_feed(ctx.user_id(), existing.id)?;
        println!("Feed already exists, following: {}", url);
        return Ok(existing);
    }

    let mut feed = Feed::new(name, url, ctx.user_id());
    feed.id = ctx.store.add_feed(&feed)?;
    ctx.store.follow_feed(ctx.user_id(), feed.id)?;

    println!("Added feed: {} ({})", feed.display_title(), feed.url);
    Ok(feed)
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.get_all_feeds()?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for feed in feeds {
        let fetched = feed
            .last_fetched_at
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{}\n  {}\n  last fetched: {}",
            feed.display_title(),
            feed.url,
            fetched
        );
    }

    Ok(())
}

pub fn remove_feed(ctx: &AppContext, url: &str) -> Result<()> {
    let url = normalize_url(url)?;
    let feed = ctx
        .store
        .get_feed_by_url(&url)?
        .ok_or_else(|| GatorError::FeedNotFound(url.clone()))?;

    ctx.store.delete_feed(feed.id)?;
    println!("Removed feed: {}", url);
    Ok(())
}

pub fn follow_feed(ctx: &AppContext, url: &str) -> Result<()> {
    let url = normalize_url(url)?;
    let feed = ctx
        .store
        .get_feed_by_url(&url)?
        .ok_or_else(|| GatorError::FeedNotFound(url.clone()))?;

    ctx.store.follow_feed(ctx.user_id(), feed.id)?;
    println!("Following: {}", feed.display_title());
    Ok(())
}

pub fn unfollow_feed(ctx: &AppContext, url_or_name: &str) -> Result<()> {
    if !ctx.store.unfollow_feed(ctx.user_id(), url_or_name)? {
        return Err(GatorError::FeedNotFound(url_or_name.to_string()));
    }
    println!("Unfollowed: {}", url_or_name);
    Ok(())
}

pub fn list_following(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.get_followed_feeds(ctx.user_id())?;

    if feeds.is_empty() {
        println!("Not following any feeds");
        return Ok(());
    }

    for feed in feeds {
        println!("* {}", feed.display_title());
    }
    Ok(())
}

/// Run the aggregator until Ctrl-C, or for a single cycle with `once`.
pub async fn aggregate(ctx: &AppContext, once: bool) -> Result<()> {
    if once {
        let report = ctx.aggregator.run_once().await?;
        print_report(&report);
        return Ok(());
    }

    let params = ctx.aggregator.defaults().clone();
    println!(
        "Collecting feeds every {}. Press Ctrl-C to stop.",
        format_duration(params.interval)
    );
    ctx.aggregator.start(params)?;

    tokio::signal::ctrl_c().await?;

    println!("Stopping after the current cycle...");
    ctx.aggregator.stop_aggregation().await;
    Ok(())
}

fn print_report(report: &CycleReport) {
    if report.feeds() == 0 {
        println!("No feeds to fetch");
        return;
    }

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(summary) => println!("  {} new posts from {}", summary.posts_stored, outcome.url),
            Err(e) => eprintln!("  Error updating {}: {}", outcome.url, e),
        }
    }
    println!(
        "Cycle complete: {} new posts, {} errors ({:.1}s)",
        report.posts_stored(),
        report.failed() + report.timed_out(),
        report.elapsed.as_secs_f64()
    );
}

pub fn browse(ctx: &AppContext, limit: usize) -> Result<()> {
    let posts = ctx.store.get_posts_for_user(ctx.user_id(), limit)?;

    if posts.is_empty() {
        println!("No posts");
        return Ok(());
    }

    posts.iter().for_each(print_post);
    Ok(())
}

fn print_post(post: &Post) {
    println!(
        "{} {}",
        post.effective_date().format("%Y-%m-%d"),
        post.display_title()
    );
    println!("  {}", post.url);
    if let Some(description) = &post.description {
        println!("  {}", description);
    }
}

fn find_post(ctx: &AppContext, url_or_title: &str) -> Result<Post> {
    ctx.store
        .get_post(url_or_title)?
        .ok_or_else(|| GatorError::PostNotFound(url_or_title.to_string()))
}

pub fn open_post(ctx: &AppContext, url_or_title: &str) -> Result<()> {
    let post = find_post(ctx, url_or_title)?;

    open::that(&post.url)?;
    println!("Opened: {}", post.url);
    Ok(())
}

pub fn bookmark_post(ctx: &AppContext, url_or_title: &str) -> Result<()> {
    let post = find_post(ctx, url_or_title)?;

    if ctx.store.bookmark_post(ctx.user_id(), post.id)? {
        println!("Bookmarked: {}", post.display_title());
    } else {
        println!("Already bookmarked: {}", post.display_title());
    }
    Ok(())
}

pub fn list_bookmarks(ctx: &AppContext) -> Result<()> {
    let posts = ctx.store.get_bookmarked_posts(ctx.user_id())?;

    if posts.is_empty() {
        println!("No bookmarks");
        return Ok(());
    }

    posts.iter().for_each(print_post);
    Ok(())
}
