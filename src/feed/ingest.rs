//! Merging parsed feed documents into stored state.
//!
//! Both functions are pure: they mutate in-memory records and hand back what
//! changed. Writing the result to the database is up to the caller.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::types::{Entry, Feed, NewEntry, ParsedEntry, ParsedFeed};

/// Apply document-level metadata to a feed.
///
/// Title and update timestamp are always overwritten, even with `None`.
/// The homepage is only filled in while it is unset: first from the
/// document, otherwise from the longest common prefix of the entry URLs that
/// live under the feed URL.
pub fn update_feed_metadata(feed: &mut Feed, parsed: &ParsedFeed, now: DateTime<Utc>) {
    feed.title = parsed.title.clone();
    feed.updated_at = parsed.updated_at;
    feed.fetched_at = Some(now);

    if has_homepage(feed) {
        return;
    }

    feed.homepage_url = parsed
        .homepage_url
        .clone()
        .filter(|url| !url.is_empty())
        .or_else(|| {
            let urls = parsed
                .entries
                .iter()
                .map(|e| e.url.as_str())
                .filter(|url| url.starts_with(&feed.url));
            common_prefix(urls)
        });
}

fn has_homepage(feed: &Feed) -> bool {
    feed.homepage_url.as_deref().is_some_and(|url| !url.is_empty())
}

/// Longest common character prefix of `urls`, or None if empty.
pub fn common_prefix<'a>(urls: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut iter = urls.into_iter();
    let mut prefix: &str = iter.next()?;

    for url in iter {
        let len = prefix
            .char_indices()
            .zip(url.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, a), _)| i + a.len_utf8());
        prefix = &prefix[..len];
        if prefix.is_empty() {
            break;
        }
    }

    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_string())
    }
}

/// Classify parsed entries against stored ones.
///
/// `stored` holds the already persisted entries whose URL appears in the
/// document, whichever feed owns them. Each URL is considered once; later
/// duplicates in the same document are ignored. Returns the entries to
/// insert and the stored entries that were modified, both in document order.
pub fn merge_entries(
    feed_id: i64,
    parsed: &[ParsedEntry],
    mut stored: HashMap<String, Entry>,
) -> (Vec<NewEntry>, Vec<Entry>) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut new_entries = Vec::new();
    let mut updated_entries = Vec::new();

    for item in parsed {
        if !seen.insert(item.url.as_str()) {
            continue;
        }

        match stored.remove(&item.url) {
            None => new_entries.push(NewEntry {
                feed_id,
                url: item.url.clone(),
                title: item.title.clone(),
                content_from_feed: item.content.clone(),
                updated_at: item.updated_at,
            }),
            Some(mut entry) => {
                if entry.title != item.title || entry.updated_at != item.updated_at {
                    entry.title = item.title.clone();
                    entry.content_from_feed = item.content.clone();
                    entry.updated_at = item.updated_at;
                    updated_entries.push(entry);
                }
            }
        }
    }

    (new_entries, updated_entries)
}
