//! Feed reading for mureader.
//!
//! Fetching and parsing feed documents, merging them into stored entries,
//! and the per-user subscription and like state built on top.

pub mod fetcher;
pub mod ingest;
pub mod repository;
pub mod service;
pub mod types;
pub mod updater;

pub use fetcher::{parse_feed, validate_url, FeedFetcher};
pub use ingest::{common_prefix, merge_entries, update_feed_metadata};
pub use repository::{
    EntryRepository, FeedRepository, SubscriptionRepository, UserEntryRepository,
};
pub use service::{FeedService, RefreshSummary, SubscribeOutcome};
pub use types::{
    Entry, EntryListing, Feed, IngestReport, NewEntry, ParsedEntry, ParsedFeed, SubscribedFeed,
    DEFAULT_LATEST_LIMIT, MAX_CONTENT_LENGTH, MAX_URL_LENGTH,
};
pub use updater::{start_feed_updater, FeedUpdater};
