//! Response body decoding.
//!
//! RSS 2.0 channels are read directly so that item dates reach the normalizer
//! exactly as published. Anything else (Atom, JSON Feed, RSS that the strict
//! reader rejects) goes through `feed-rs`, whose already-parsed dates are
//! rendered as RFC 3339.

use feed_rs::parser;
use serde::Deserialize;

use crate::app::{GatorError, Result};
use crate::domain::{FeedDocument, RawItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    description: String,
    #[serde(default, rename = "item")]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

pub fn decode(body: &[u8]) -> Result<FeedDocument> {
    if let Some(document) = decode_rss(body) {
        return Ok(document);
    }

    let feed = parser::parse(body).map_err(|e| GatorError::FeedParse(e.to_string()))?;
    Ok(from_parsed(feed))
}

fn decode_rss(body: &[u8]) -> Option<FeedDocument> {
    let text = std::str::from_utf8(body).ok()?;
    let rss: Rss = quick_xml::de::from_str(text).ok()?;
    let channel = rss.channel;

    Some(FeedDocument {
        title: channel.title.trim().to_string(),
        link: channel.link.trim().to_string(),
        description: channel.description,
        items: channel
            .items
            .into_iter()
            .map(|item| RawItem {
                title: item.title,
                link: item.link.map(|l| l.trim().to_string()).unwrap_or_default(),
                description: item.description,
                pub_date: item.pub_date,
            })
            .collect(),
    })
}

fn from_parsed(feed: feed_rs::model::Feed) -> FeedDocument {
    FeedDocument {
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        link: feed
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default(),
        description: feed.description.map(|d| d.content).unwrap_or_default(),
        items: feed
            .entries
            .into_iter()
            .map(|entry| RawItem {
                title: entry.title.map(|t| t.content),
                link: entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default(),
                description: entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body)),
                pub_date: entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.to_rfc3339()),
            })
            .collect(),
    }
}
