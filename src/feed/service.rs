//! Feed service: subscriptions, refreshing and reading state.

use chrono::Utc;
use tracing::{info, warn};

use super::fetcher::{validate_url, FeedFetcher};
use super::ingest::{merge_entries, update_feed_metadata};
use super::repository::{
    EntryRepository, FeedRepository, SubscriptionRepository, UserEntryRepository,
};
use super::types::{
    EntryListing, Feed, IngestReport, ParsedFeed, SubscribedFeed, DEFAULT_LATEST_LIMIT,
};
use crate::db::Database;
use crate::{ReaderError, Result};

/// Result of a subscribe request.
#[derive(Debug)]
pub struct SubscribeOutcome {
    pub feed: Feed,
    /// False if the user was already subscribed.
    pub newly_subscribed: bool,
    /// Outcome of the initial fetch, if one was attempted.
    pub refresh: Option<Result<IngestReport>>,
}

/// Totals of a refresh pass over many feeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub feeds: usize,
    pub failed: usize,
    pub new_entries: usize,
    pub updated_entries: usize,
}

/// Service for feed operations.
pub struct FeedService<'a> {
    db: &'a Database,
    fetcher: &'a FeedFetcher,
}

impl<'a> FeedService<'a> {
    /// Create a new FeedService.
    pub fn new(db: &'a Database, fetcher: &'a FeedFetcher) -> Self {
        Self { db, fetcher }
    }

    /// Subscribe a user to the feed at `url`.
    ///
    /// The feed row is shared between users. Entries already stored for it
    /// are added to the user's stream at once; a feed that has never been
    /// fetched is fetched now. A failed fetch keeps the subscription.
    pub async fn subscribe(&self, user_id: i64, url: &str) -> Result<SubscribeOutcome> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ReaderError::Validation("Feed URL is required".to_string()));
        }
        validate_url(url)?;

        let pool = self.db.pool();
        let feed = FeedRepository::new(pool).find_or_create(url).await?;
        let newly_subscribed = SubscriptionRepository::new(pool)
            .subscribe(user_id, feed.id)
            .await?;
        UserEntryRepository::new(pool).backfill(user_id, feed.id).await?;

        if newly_subscribed {
            info!(user_id, feed_id = feed.id, url, "Subscribed to feed");
        }

        let refresh = if feed.fetched_at.is_none() {
            let result = self.refresh_feed(feed.clone()).await;
            if let Err(e) = &result {
                warn!(feed_id = feed.id, error = %e, "Initial fetch failed");
            }
            Some(result)
        } else {
            None
        };

        let feed = FeedRepository::new(pool)
            .get_by_id(feed.id)
            .await?
            .unwrap_or(feed);

        Ok(SubscribeOutcome {
            feed,
            newly_subscribed,
            refresh,
        })
    }

    /// Remove a user's subscription.
    pub async fn unsubscribe(&self, user_id: i64, feed_id: i64) -> Result<()> {
        let removed = SubscriptionRepository::new(self.db.pool())
            .unsubscribe(user_id, feed_id)
            .await?;
        if !removed {
            return Err(ReaderError::NotFound("subscription".to_string()));
        }
        info!(user_id, feed_id, "Unsubscribed from feed");
        Ok(())
    }

    /// Fetch a feed by ID and merge it into the database.
    pub async fn refresh(&self, feed_id: i64) -> Result<IngestReport> {
        let feed = FeedRepository::new(self.db.pool())
            .get_by_id(feed_id)
            .await?
            .ok_or_else(|| ReaderError::NotFound("feed".to_string()))?;
        self.refresh_feed(feed).await
    }

    /// Refresh a feed on behalf of a subscriber.
    pub async fn refresh_for_user(&self, user_id: i64, feed_id: i64) -> Result<IngestReport> {
        let subscribed = SubscriptionRepository::new(self.db.pool())
            .is_subscribed(user_id, feed_id)
            .await?;
        if !subscribed {
            return Err(ReaderError::NotFound("subscription".to_string()));
        }
        self.refresh(feed_id).await
    }

    /// Refresh every feed that has a subscriber. Failures are logged and
    /// counted but do not stop the pass.
    pub async fn refresh_all(&self) -> Result<RefreshSummary> {
        let feeds = FeedRepository::new(self.db.pool()).list_subscribed().await?;
        let mut summary = RefreshSummary {
            feeds: feeds.len(),
            ..Default::default()
        };

        for feed in feeds {
            let (feed_id, url) = (feed.id, feed.url.clone());
            match self.refresh_feed(feed).await {
                Ok(report) => {
                    summary.new_entries += report.new;
                    summary.updated_entries += report.updated;
                }
                Err(e) => {
                    warn!(feed_id, url = %url, error = %e, "Failed to refresh feed");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn refresh_feed(&self, feed: Feed) -> Result<IngestReport> {
        let parsed = self.fetcher.fetch(&feed.url).await?;
        self.ingest(feed, &parsed).await
    }

    /// Merge a parsed document into a feed and persist the result.
    ///
    /// Metadata, new entries, changed entries and the subscribers' stream
    /// rows are written in one transaction.
    pub async fn ingest(&self, mut feed: Feed, parsed: &ParsedFeed) -> Result<IngestReport> {
        let urls: Vec<&str> = parsed.entries.iter().map(|e| e.url.as_str()).collect();

        let mut tx = self.db.pool().begin().await?;

        let stored = EntryRepository::find_by_urls(&mut tx, &urls).await?;
        update_feed_metadata(&mut feed, parsed, Utc::now());
        let (new_entries, updated_entries) = merge_entries(feed.id, &parsed.entries, stored);

        FeedRepository::save_metadata(&mut tx, &feed).await?;

        let mut report = IngestReport::default();
        for entry in &new_entries {
            if let Some(entry_id) = EntryRepository::insert(&mut tx, entry).await? {
                UserEntryRepository::fan_out(&mut tx, entry_id, feed.id).await?;
                report.new += 1;
            }
        }
        for entry in &updated_entries {
            EntryRepository::update(&mut tx, entry).await?;
            report.updated += 1;
        }

        tx.commit().await?;

        info!(
            feed_id = feed.id,
            new = report.new,
            updated = report.updated,
            "Feed ingested"
        );
        Ok(report)
    }

    /// Like or unlike an entry for a user.
    pub async fn set_liked(&self, user_id: i64, entry_id: i64, liked: bool) -> Result<()> {
        let pool = self.db.pool();
        if EntryRepository::new(pool).get_by_id(entry_id).await?.is_none() {
            return Err(ReaderError::NotFound("entry".to_string()));
        }
        UserEntryRepository::new(pool)
            .set_liked(user_id, entry_id, liked)
            .await
    }

    /// The newest entries across all feeds.
    pub async fn latest(&self, user_id: Option<i64>) -> Result<Vec<EntryListing>> {
        EntryRepository::new(self.db.pool())
            .latest(user_id, DEFAULT_LATEST_LIMIT)
            .await
    }

    /// Entries in the user's stream that are not liked.
    pub async fn news(&self, user_id: i64) -> Result<Vec<EntryListing>> {
        EntryRepository::new(self.db.pool())
            .list_for_user(user_id, false)
            .await
    }

    /// Entries the user has liked.
    pub async fn liked(&self, user_id: i64) -> Result<Vec<EntryListing>> {
        EntryRepository::new(self.db.pool())
            .list_for_user(user_id, true)
            .await
    }

    /// The user's subscribed feeds.
    pub async fn subscriptions(&self, user_id: i64) -> Result<Vec<SubscribedFeed>> {
        SubscriptionRepository::new(self.db.pool())
            .list_for_user(user_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedsConfig;
    use crate::db::{NewUser, UserRepository};
    use crate::feed::types::ParsedEntry;
    use chrono::{DateTime, Duration, TimeZone};

    const FEED_URL: &str = "https://blog.example.com/";

    struct Fixture {
        db: Database,
        fetcher: FeedFetcher,
        user_id: i64,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = Database::open_in_memory().await.unwrap();
            let user = UserRepository::new(db.pool())
                .create(&NewUser::new("reader@example.com"))
                .await
                .unwrap();
            let fetcher = FeedFetcher::new(&FeedsConfig::default()).unwrap();
            Self {
                db,
                fetcher,
                user_id: user.id,
            }
        }

        fn service(&self) -> FeedService<'_> {
            FeedService::new(&self.db, &self.fetcher)
        }

        async fn add_user(&self, email: &str) -> i64 {
            UserRepository::new(self.db.pool())
                .create(&NewUser::new(email))
                .await
                .unwrap()
                .id
        }

        async fn feed(&self, url: &str) -> Feed {
            FeedRepository::new(self.db.pool())
                .find_or_create(url)
                .await
                .unwrap()
        }

        async fn subscribe(&self, user_id: i64, feed_id: i64) {
            SubscriptionRepository::new(self.db.pool())
                .subscribe(user_id, feed_id)
                .await
                .unwrap();
        }

        async fn reload(&self, feed_id: i64) -> Feed {
            FeedRepository::new(self.db.pool())
                .get_by_id(feed_id)
                .await
                .unwrap()
                .unwrap()
        }
    }

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn document(entries: Vec<ParsedEntry>) -> ParsedFeed {
        ParsedFeed {
            title: Some("Example Blog".to_string()),
            updated_at: Some(ts(12) + Duration::microseconds(1500)),
            homepage_url: None,
            entries,
        }
    }

    fn post(n: u32) -> ParsedEntry {
        ParsedEntry::new(format!("https://blog.example.com/posts/{n}"))
            .with_title(format!("Post {n}"))
            .with_content(format!("<p>Body {n}</p>"))
            .with_updated_at(ts(n) + Duration::milliseconds(n as i64 * 7))
    }

    #[tokio::test]
    async fn test_ingest_persists_entries_and_metadata() {
        let fx = Fixture::new().await;
        let feed = fx.feed(FEED_URL).await;

        let report = fx
            .service()
            .ingest(feed.clone(), &document(vec![post(1), post(2)]))
            .await
            .unwrap();
        assert_eq!(report, IngestReport { new: 2, updated: 0 });

        let stored = fx.reload(feed.id).await;
        assert_eq!(stored.title.as_deref(), Some("Example Blog"));
        assert_eq!(stored.updated_at, Some(ts(12) + Duration::microseconds(1500)));
        assert!(stored.fetched_at.is_some());
        assert_eq!(
            stored.homepage_url.as_deref(),
            Some("https://blog.example.com/posts/")
        );

        let latest = fx.service().latest(None).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].entry.title.as_deref(), Some("Post 2"));
        assert_eq!(latest[0].feed_title.as_deref(), Some("Example Blog"));
    }

    #[tokio::test]
    async fn test_ingest_same_document_twice_is_idempotent() {
        let fx = Fixture::new().await;
        let feed = fx.feed(FEED_URL).await;
        let doc = document(vec![post(1), post(2), post(3)]);

        fx.service().ingest(feed.clone(), &doc).await.unwrap();
        let feed = fx.reload(feed.id).await;
        let report = fx.service().ingest(feed, &doc).await.unwrap();

        assert_eq!(report, IngestReport::default());
    }

    #[tokio::test]
    async fn test_ingest_title_change_updates_entry() {
        let fx = Fixture::new().await;
        let feed = fx.feed(FEED_URL).await;
        fx.service()
            .ingest(feed.clone(), &document(vec![post(1), post(2)]))
            .await
            .unwrap();

        let changed = post(2).with_title("Post 2, revised").with_content("new body");
        let report = fx
            .service()
            .ingest(fx.reload(feed.id).await, &document(vec![post(1), changed]))
            .await
            .unwrap();
        assert_eq!(report, IngestReport { new: 0, updated: 1 });

        let entries = EntryRepository::new(fx.db.pool())
            .get_by_urls(&["https://blog.example.com/posts/2"])
            .await
            .unwrap();
        let entry = &entries["https://blog.example.com/posts/2"];
        assert_eq!(entry.title.as_deref(), Some("Post 2, revised"));
        assert_eq!(entry.content_from_feed.as_deref(), Some("new body"));
    }

    #[tokio::test]
    async fn test_ingest_duplicate_urls_create_one_entry() {
        let fx = Fixture::new().await;
        let feed = fx.feed(FEED_URL).await;

        let report = fx
            .service()
            .ingest(feed, &document(vec![post(1), post(1).with_title("Again")]))
            .await
            .unwrap();
        assert_eq!(report.new, 1);

        let latest = fx.service().latest(None).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].entry.title.as_deref(), Some("Post 1"));
    }

    #[tokio::test]
    async fn test_ingest_keeps_homepage_once_set() {
        let fx = Fixture::new().await;
        let feed = fx.feed(FEED_URL).await;
        fx.service()
            .ingest(feed.clone(), &document(vec![post(1), post(2)]))
            .await
            .unwrap();

        let mut moved = document(vec![ParsedEntry::new("https://blog.example.com/feed.xml/x")]);
        moved.homepage_url = Some("https://other.example.com/".to_string());
        fx.service()
            .ingest(fx.reload(feed.id).await, &moved)
            .await
            .unwrap();

        assert_eq!(
            fx.reload(feed.id).await.homepage_url.as_deref(),
            Some("https://blog.example.com/posts/")
        );
    }

    #[tokio::test]
    async fn test_ingest_entry_owned_by_other_feed() {
        let fx = Fixture::new().await;
        let first = fx.feed(FEED_URL).await;
        let second = fx.feed("https://mirror.example.org/rss").await;

        fx.service()
            .ingest(first.clone(), &document(vec![post(1)]))
            .await
            .unwrap();
        let report = fx
            .service()
            .ingest(second, &document(vec![post(1), post(2)]))
            .await
            .unwrap();
        assert_eq!(report, IngestReport { new: 1, updated: 0 });

        let entries = EntryRepository::new(fx.db.pool())
            .get_by_urls(&["https://blog.example.com/posts/1"])
            .await
            .unwrap();
        assert_eq!(entries["https://blog.example.com/posts/1"].feed_id, first.id);
    }

    #[tokio::test]
    async fn test_ingest_fans_out_to_subscribers() {
        let fx = Fixture::new().await;
        let other = fx.add_user("other@example.com").await;
        let outsider = fx.add_user("outsider@example.com").await;
        let feed = fx.feed(FEED_URL).await;
        fx.subscribe(fx.user_id, feed.id).await;
        fx.subscribe(other, feed.id).await;

        fx.service()
            .ingest(feed, &document(vec![post(1), post(2)]))
            .await
            .unwrap();

        let service = fx.service();
        assert_eq!(service.news(fx.user_id).await.unwrap().len(), 2);
        assert_eq!(service.news(other).await.unwrap().len(), 2);
        assert!(service.news(outsider).await.unwrap().is_empty());
        assert!(service.liked(fx.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_like_moves_entry_from_news_to_liked() {
        let fx = Fixture::new().await;
        let feed = fx.feed(FEED_URL).await;
        fx.subscribe(fx.user_id, feed.id).await;
        fx.service()
            .ingest(feed, &document(vec![post(1), post(2)]))
            .await
            .unwrap();

        let service = fx.service();
        let news = service.news(fx.user_id).await.unwrap();
        let entry_id = news[0].entry.id;

        service.set_liked(fx.user_id, entry_id, true).await.unwrap();
        let liked = service.liked(fx.user_id).await.unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].entry.id, entry_id);
        assert_eq!(service.news(fx.user_id).await.unwrap().len(), 1);

        service.set_liked(fx.user_id, entry_id, false).await.unwrap();
        assert!(service.liked(fx.user_id).await.unwrap().is_empty());

        let err = service.set_liked(fx.user_id, 9999, true).await.unwrap_err();
        assert!(matches!(err, ReaderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_subscribe_rejects_invalid_urls() {
        let fx = Fixture::new().await;
        let service = fx.service();

        for url in ["", "   ", "ftp://example.com/feed", "http://localhost/feed"] {
            let err = service.subscribe(fx.user_id, url).await.unwrap_err();
            assert!(matches!(err, ReaderError::Validation(_)), "{url:?}");
        }
        assert!(service.subscriptions(fx.user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_to_known_feed_backfills_stream() {
        let fx = Fixture::new().await;
        let feed = fx.feed(FEED_URL).await;
        fx.service()
            .ingest(feed.clone(), &document(vec![post(1), post(2)]))
            .await
            .unwrap();

        // Already fetched, so no network access happens here.
        let outcome = fx.service().subscribe(fx.user_id, FEED_URL).await.unwrap();
        assert!(outcome.newly_subscribed);
        assert!(outcome.refresh.is_none());
        assert_eq!(outcome.feed.id, feed.id);

        let again = fx.service().subscribe(fx.user_id, FEED_URL).await.unwrap();
        assert!(!again.newly_subscribed);

        let service = fx.service();
        assert_eq!(service.news(fx.user_id).await.unwrap().len(), 2);
        let subs = service.subscriptions(fx.user_id).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].unliked_count, 2);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let fx = Fixture::new().await;
        let feed = fx.feed(FEED_URL).await;
        fx.subscribe(fx.user_id, feed.id).await;

        let service = fx.service();
        service.unsubscribe(fx.user_id, feed.id).await.unwrap();
        assert!(service.subscriptions(fx.user_id).await.unwrap().is_empty());

        let err = service.unsubscribe(fx.user_id, feed.id).await.unwrap_err();
        assert!(matches!(err, ReaderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_refresh_unknown_feed() {
        let fx = Fixture::new().await;
        let err = fx.service().refresh(42).await.unwrap_err();
        assert!(matches!(err, ReaderError::NotFound(_)));

        let feed = fx.feed(FEED_URL).await;
        let err = fx
            .service()
            .refresh_for_user(fx.user_id, feed.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ReaderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_refresh_all_with_no_subscriptions() {
        let fx = Fixture::new().await;
        fx.feed(FEED_URL).await;
        let summary = fx.service().refresh_all().await.unwrap();
        assert_eq!(summary, RefreshSummary::default());
    }
}
