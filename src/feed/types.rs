//! Feed types for mureader.

use chrono::{DateTime, Utc};

use crate::datetime::format_relative;

/// Maximum length of a feed or entry URL.
pub const MAX_URL_LENGTH: usize = 1000;

/// Maximum stored length of entry content, in characters.
pub const MAX_CONTENT_LENGTH: usize = 10000;

/// Number of entries shown on the latest-entries page.
pub const DEFAULT_LATEST_LIMIT: i64 = 100;

/// A syndication feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    pub id: i64,
    /// Feed document URL (unique).
    pub url: String,
    /// Website the feed belongs to.
    pub homepage_url: Option<String>,
    pub title: Option<String>,
    /// Update timestamp reported by the document.
    pub updated_at: Option<DateTime<Utc>>,
    /// Last successful fetch.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Feed {
    /// Title for display, falling back to the URL.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => &self.url,
        }
    }
}

/// A stored entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: i64,
    /// Feed that first published this URL.
    pub feed_id: i64,
    /// Entry URL, unique across all feeds.
    pub url: String,
    pub title: Option<String>,
    pub content_from_feed: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entry {
    /// Host part of the entry URL, or an empty string if it has none.
    pub fn domain_name(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Human readable age such as "3 hours ago".
    pub fn relative_date(&self, now: DateTime<Utc>) -> Option<String> {
        self.updated_at.map(|ts| format_relative(&ts, &now))
    }
}

/// An entry staged for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub feed_id: i64,
    pub url: String,
    pub title: Option<String>,
    pub content_from_feed: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A feed document after parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub homepage_url: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

/// One entry of a parsed feed document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    pub url: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ParsedEntry {
    /// Create a parsed entry with only a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            content: None,
            updated_at: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the update timestamp.
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }
}

/// An entry as shown in listings, joined with its feed and the reader's state.
#[derive(Debug, Clone)]
pub struct EntryListing {
    pub entry: Entry,
    pub feed_title: Option<String>,
    /// Liked flag of the current reader, if the entry is in their stream.
    pub liked: Option<bool>,
}

/// A subscribed feed with the number of entries waiting in the reader's stream.
#[derive(Debug, Clone)]
pub struct SubscribedFeed {
    pub feed: Feed,
    pub unliked_count: i64,
}

/// Outcome of merging a document into stored state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub new: usize,
    pub updated: usize,
}
