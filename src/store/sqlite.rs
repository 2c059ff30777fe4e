use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{GatorError, Result};
use crate::domain::{Feed, Post, PostDraft};
use crate::store::Store;

const FEED_COLUMNS: &str =
    "f.id, f.name, f.url, f.user_id, f.last_fetched_at, f.created_at, f.updated_at";
const POST_COLUMNS: &str =
    "p.id, p.feed_id, p.title, p.url, p.description, p.published_at, p.created_at, p.updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![
            M::up(include_str!("../../migrations/001-initial/up.sql")),
            M::up(include_str!("../../migrations/002-bookmarks/up.sql")),
        ]);

        let mut conn = self.conn()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            GatorError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    /// Fixed-width UTC so that text order matches time order in SQL.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            user_id: row.get(3)?,
            last_fetched_at: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| Self::parse_datetime(&s)),
            created_at: row
                .get::<_, String>(5)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
            updated_at: row
                .get::<_, String>(6)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
        Ok(Post {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            description: row.get(4)?,
            published_at: row
                .get::<_, Option<String>>(5)?
                .and_then(|s| Self::parse_datetime(&s)),
            created_at: row
                .get::<_, String>(6)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
            updated_at: row
                .get::<_, String>(7)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    fn query_feeds(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Feed>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let feeds = stmt
            .query_map(params, Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(feeds)
    }

    fn query_posts(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let posts = stmt
            .query_map(params, Self::post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(posts)
    }
}

impl Store for SqliteStore {
    fn next_feeds_to_fetch(&self, limit: usize) -> Result<Vec<Feed>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // Only followed feeds are worth fetching. Never-fetched feeds first,
        // then the stalest.
        self.query_feeds(
            &format!(
                "SELECT {FEED_COLUMNS} FROM feeds f
                 WHERE EXISTS (SELECT 1 FROM feed_follows ff WHERE ff.feed_id = f.id)
                 ORDER BY f.last_fetched_at IS NOT NULL, f.last_fetched_at ASC, f.id ASC
                 LIMIT ?1"
            ),
            params![limit as i64],
        )
    }

    fn mark_feed_fetched(&self, feed_id: i64, fetched_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE feeds SET last_fetched_at = ?2, updated_at = ?2 WHERE id = ?1",
            params![feed_id, Self::format_datetime(&fetched_at)],
        )?;

        if updated == 0 {
            return Err(GatorError::FeedNotFound(feed_id.to_string()));
        }
        Ok(())
    }

    fn create_post(&self, draft: &PostDraft) -> Result<Post> {
        let conn = self.conn()?;
        let stamp = Self::format_datetime(&draft.fetched_at);

        conn.execute(
            "INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                draft.feed_id,
                draft.title,
                draft.url,
                draft.description,
                draft.published_at.as_ref().map(Self::format_datetime),
                stamp
            ],
        )?;

        Ok(Post {
            id: conn.last_insert_rowid(),
            feed_id: draft.feed_id,
            title: draft.title.clone(),
            url: draft.url.clone(),
            description: draft.description.clone(),
            published_at: draft.published_at,
            created_at: draft.fetched_at,
            updated_at: draft.fetched_at,
        })
    }

    fn count_followed_feeds(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT feed_id) FROM feed_follows",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    fn add_feed(&self, feed: &Feed) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feeds (name, url, user_id, last_fetched_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                feed.name,
                feed.url,
                feed.user_id,
                feed.last_fetched_at.as_ref().map(Self::format_datetime),
                Self::format_datetime(&feed.created_at),
                Self::format_datetime(&feed.updated_at)
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.conn()?;
        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.id = ?1"),
                params![id],
                Self::feed_from_row,
            )
            .optional()?;
        Ok(feed)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.conn()?;
        let feed = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds f WHERE f.url = ?1"),
                params![url],
                Self::feed_from_row,
            )
            .optional()?;
        Ok(feed)
    }

    fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        self.query_feeds(
            &format!("SELECT {FEED_COLUMNS} FROM feeds f ORDER BY f.name, f.url"),
            [],
        )
    }

    fn delete_feed(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM feeds WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn follow_feed(&self, user_id: i64, feed_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO feed_follows (user_id, feed_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, feed_id, Self::format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn unfollow_feed(&self, user_id: i64, url_or_name: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM feed_follows
             WHERE user_id = ?1
               AND feed_id IN (SELECT id FROM feeds WHERE url = ?2 OR name = ?2)",
            params![user_id, url_or_name],
        )?;
        Ok(removed > 0)
    }

    fn get_followed_feeds(&self, user_id: i64) -> Result<Vec<Feed>> {
        self.query_feeds(
            &format!(
                "SELECT {FEED_COLUMNS} FROM feeds f
                 JOIN feed_follows ff ON ff.feed_id = f.id
                 WHERE ff.user_id = ?1
                 ORDER BY f.name, f.url"
            ),
            params![user_id],
        )
    }

    fn get_post(&self, url_or_title: &str) -> Result<Option<Post>> {
        let conn = self.conn()?;
        let post = conn
            .query_row(
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts p
                     WHERE p.url = ?1 OR p.title = ?1
                     ORDER BY p.id DESC LIMIT 1"
                ),
                params![url_or_title],
                Self::post_from_row,
            )
            .optional()?;
        Ok(post)
    }

    fn get_posts_by_feed(&self, feed_id: i64) -> Result<Vec<Post>> {
        self.query_posts(
            &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.feed_id = ?1 ORDER BY p.id"),
            params![feed_id],
        )
    }

    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<Post>> {
        self.query_posts(
            &format!(
                "SELECT {POST_COLUMNS} FROM posts p
                 JOIN feed_follows ff ON ff.feed_id = p.feed_id
                 WHERE ff.user_id = ?1
                 ORDER BY COALESCE(p.published_at, p.updated_at) DESC, p.id DESC
                 LIMIT ?2"
            ),
            params![user_id, limit as i64],
        )
    }

    fn bookmark_post(&self, user_id: i64, post_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let added = conn.execute(
            "INSERT OR IGNORE INTO post_bookmarks (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, post_id, Self::format_datetime(&Utc::now())],
        )?;
        Ok(added > 0)
    }

    fn get_bookmarked_posts(&self, user_id: i64) -> Result<Vec<Post>> {
        self.query_posts(
            &format!(
                "SELECT {POST_COLUMNS} FROM posts p
                 JOIN post_bookmarks b ON b.post_id = p.id
                 WHERE b.user_id = ?1
                 ORDER BY b.created_at DESC, b.id DESC"
            ),
            params![user_id],
        )
    }
}
