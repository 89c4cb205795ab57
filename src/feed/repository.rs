//! Feed, entry and subscription repositories.
//!
//! Pool-backed methods serve the pages. The associated functions that take a
//! `SqliteConnection` are used by the feed service inside its ingest
//! transaction.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::types::{Entry, EntryListing, Feed, NewEntry, SubscribedFeed};
use crate::datetime::{parse_datetime, to_db_option};
use crate::db::DbPool;
use crate::{ReaderError, Result};

// Bound parameters per IN (...) lookup.
const URL_CHUNK_SIZE: usize = 500;

const FEED_COLUMNS: &str = "f.id, f.url, f.homepage_url, f.title, f.updated_at, f.fetched_at";
const ENTRY_COLUMNS: &str = "e.id, e.feed_id, e.url, e.title, e.content_from_feed, e.updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    url: String,
    homepage_url: Option<String>,
    title: Option<String>,
    updated_at: Option<String>,
    fetched_at: Option<String>,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            url: row.url,
            homepage_url: row.homepage_url,
            title: row.title,
            updated_at: row.updated_at.and_then(|s| parse_datetime(&s)),
            fetched_at: row.fetched_at.and_then(|s| parse_datetime(&s)),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct EntryRow {
    id: i64,
    feed_id: i64,
    url: String,
    title: Option<String>,
    content_from_feed: Option<String>,
    updated_at: Option<String>,
}

impl From<EntryRow> for Entry {
    fn from(row: EntryRow) -> Self {
        Entry {
            id: row.id,
            feed_id: row.feed_id,
            url: row.url,
            title: row.title,
            content_from_feed: row.content_from_feed,
            updated_at: row.updated_at.and_then(|s| parse_datetime(&s)),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct EntryListingRow {
    #[sqlx(flatten)]
    entry: EntryRow,
    feed_title: Option<String>,
    liked: Option<bool>,
}

impl From<EntryListingRow> for EntryListing {
    fn from(row: EntryListingRow) -> Self {
        EntryListing {
            entry: row.entry.into(),
            feed_title: row.feed_title,
            liked: row.liked,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SubscribedFeedRow {
    #[sqlx(flatten)]
    feed: FeedRow,
    unliked_count: i64,
}

/// Repository for feeds.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let row = sqlx::query_as::<_, FeedRow>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds f WHERE f.id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Feed::from))
    }

    /// Get a feed by its document URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let row = sqlx::query_as::<_, FeedRow>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds f WHERE f.url = ?"
        ))
        .bind(url)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Feed::from))
    }

    /// Return the feed for `url`, creating an empty one if needed.
    pub async fn find_or_create(&self, url: &str) -> Result<Feed> {
        sqlx::query("INSERT INTO feeds (url) VALUES (?) ON CONFLICT(url) DO NOTHING")
            .bind(url)
            .execute(self.pool)
            .await?;

        self.get_by_url(url)
            .await?
            .ok_or_else(|| ReaderError::NotFound("feed".to_string()))
    }

    /// List feeds that have at least one subscriber.
    pub async fn list_subscribed(&self) -> Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, FeedRow>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds f
             WHERE EXISTS (SELECT 1 FROM subscriptions s WHERE s.feed_id = f.id)
             ORDER BY f.id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Feed::from).collect())
    }

    /// Write title, timestamps and homepage of a feed.
    pub async fn save_metadata(conn: &mut SqliteConnection, feed: &Feed) -> Result<()> {
        sqlx::query(
            "UPDATE feeds SET title = ?, updated_at = ?, fetched_at = ?, homepage_url = ?
             WHERE id = ?",
        )
        .bind(&feed.title)
        .bind(to_db_option(feed.updated_at.as_ref()))
        .bind(to_db_option(feed.fetched_at.as_ref()))
        .bind(&feed.homepage_url)
        .bind(feed.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

/// Repository for entries and entry listings.
pub struct EntryRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> EntryRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get an entry by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Entry>> {
        let row = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Entry::from))
    }

    /// Stored entries whose URL is in `urls`, keyed by URL, across all feeds.
    pub async fn get_by_urls(&self, urls: &[&str]) -> Result<HashMap<String, Entry>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_urls(&mut conn, urls).await
    }

    /// Newest entries of all feeds.
    ///
    /// With a reader, each listing carries that reader's liked flag.
    pub async fn latest(&self, user_id: Option<i64>, limit: i64) -> Result<Vec<EntryListing>> {
        let rows = sqlx::query_as::<_, EntryListingRow>(&format!(
            "SELECT {ENTRY_COLUMNS}, f.title AS feed_title, ue.liked AS liked
             FROM entries e
             JOIN feeds f ON f.id = e.feed_id
             LEFT JOIN user_entries ue ON ue.entry_id = e.id AND ue.user_id = ?
             ORDER BY e.updated_at DESC, e.id DESC
             LIMIT ?"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(EntryListing::from).collect())
    }

    /// Entries in a reader's stream with the given liked flag, newest first.
    pub async fn list_for_user(&self, user_id: i64, liked: bool) -> Result<Vec<EntryListing>> {
        let rows = sqlx::query_as::<_, EntryListingRow>(&format!(
            "SELECT {ENTRY_COLUMNS}, f.title AS feed_title, ue.liked AS liked
             FROM user_entries ue
             JOIN entries e ON e.id = ue.entry_id
             JOIN feeds f ON f.id = e.feed_id
             WHERE ue.user_id = ? AND ue.liked = ?
             ORDER BY e.updated_at DESC, e.id DESC"
        ))
        .bind(user_id)
        .bind(liked)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(EntryListing::from).collect())
    }

    /// Look up stored entries by URL on an open connection.
    pub async fn find_by_urls(
        conn: &mut SqliteConnection,
        urls: &[&str],
    ) -> Result<HashMap<String, Entry>> {
        let mut found = HashMap::new();

        for chunk in urls.chunks(URL_CHUNK_SIZE) {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.url IN ("
            ));
            let mut separated = query.separated(", ");
            for url in chunk {
                separated.push_bind(*url);
            }
            separated.push_unseparated(")");

            let rows = query
                .build_query_as::<EntryRow>()
                .fetch_all(&mut *conn)
                .await?;
            found.extend(rows.into_iter().map(|row| (row.url.clone(), Entry::from(row))));
        }

        Ok(found)
    }

    /// Insert an entry. Returns None if its URL is already stored.
    pub async fn insert(conn: &mut SqliteConnection, entry: &NewEntry) -> Result<Option<i64>> {
        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO entries (feed_id, url, title, content_from_feed, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(url) DO NOTHING
             RETURNING id",
        )
        .bind(entry.feed_id)
        .bind(&entry.url)
        .bind(&entry.title)
        .bind(&entry.content_from_feed)
        .bind(to_db_option(entry.updated_at.as_ref()))
        .fetch_optional(&mut *conn)
        .await?;
        Ok(id)
    }

    /// Write title, content and timestamp of a stored entry.
    pub async fn update(conn: &mut SqliteConnection, entry: &Entry) -> Result<()> {
        sqlx::query(
            "UPDATE entries SET title = ?, content_from_feed = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&entry.title)
        .bind(&entry.content_from_feed)
        .bind(to_db_option(entry.updated_at.as_ref()))
        .bind(entry.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

/// Repository for user subscriptions.
pub struct SubscriptionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SubscriptionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Subscribe a user to a feed. Returns false if already subscribed.
    pub async fn subscribe(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO subscriptions (user_id, feed_id) VALUES (?, ?)
             ON CONFLICT(user_id, feed_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(feed_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a subscription. Returns false if it did not exist.
    pub async fn unsubscribe(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check whether a user is subscribed to a feed.
    pub async fn is_subscribed(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE user_id = ? AND feed_id = ?)",
        )
        .bind(user_id)
        .bind(feed_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// A user's feeds with the number of unliked entries of each.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<SubscribedFeed>> {
        let rows = sqlx::query_as::<_, SubscribedFeedRow>(&format!(
            "SELECT {FEED_COLUMNS},
                    (SELECT COUNT(*) FROM user_entries ue
                     JOIN entries e ON e.id = ue.entry_id
                     WHERE ue.user_id = s.user_id AND e.feed_id = f.id AND ue.liked = 0)
                    AS unliked_count
             FROM subscriptions s
             JOIN feeds f ON f.id = s.feed_id
             WHERE s.user_id = ?
             ORDER BY COALESCE(f.title, f.url) COLLATE NOCASE, f.id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SubscribedFeed {
                feed: row.feed.into(),
                unliked_count: row.unliked_count,
            })
            .collect())
    }
}

/// Repository for per-user entry state.
pub struct UserEntryRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserEntryRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Set the liked flag, creating the row if needed.
    pub async fn set_liked(&self, user_id: i64, entry_id: i64, liked: bool) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_entries (user_id, entry_id, liked) VALUES (?, ?, ?)
             ON CONFLICT(user_id, entry_id) DO UPDATE SET liked = excluded.liked",
        )
        .bind(user_id)
        .bind(entry_id)
        .bind(liked)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Put every entry of a feed into a user's stream. Existing rows are kept.
    pub async fn backfill(&self, user_id: i64, feed_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO user_entries (user_id, entry_id, liked)
             SELECT ?, e.id, 0 FROM entries e WHERE e.feed_id = ?
             ON CONFLICT(user_id, entry_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(feed_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Put a new entry into the stream of every subscriber of `feed_id`.
    pub async fn fan_out(conn: &mut SqliteConnection, entry_id: i64, feed_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "INSERT INTO user_entries (user_id, entry_id, liked)
             SELECT s.user_id, ?, 0 FROM subscriptions s WHERE s.feed_id = ?
             ON CONFLICT(user_id, entry_id) DO NOTHING",
        )
        .bind(entry_id)
        .bind(feed_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
