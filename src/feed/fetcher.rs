//! Feed fetching with SSRF protection and resource limits.

use std::net::IpAddr;
use std::time::Duration;

use feed_rs::model::Link;
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use super::types::{ParsedEntry, ParsedFeed, MAX_URL_LENGTH};
use crate::config::FeedsConfig;
use crate::{ReaderError, Result};

const USER_AGENT: &str = concat!("mureader/", env!("CARGO_PKG_VERSION"));

/// HTTP client for feed documents.
#[derive(Clone)]
pub struct FeedFetcher {
    client: Client,
    max_feed_size: u64,
    max_content_length: usize,
}

impl FeedFetcher {
    /// Build a fetcher from the `[feeds]` configuration.
    pub fn new(config: &FeedsConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ReaderError::Feed(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
            max_content_length: config.max_content_length,
        })
    }

    /// Fetch and parse the document at `url`.
    pub async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        validate_url(url)?;
        debug!(url, "Fetching feed");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ReaderError::Feed(format!("failed to fetch feed: {e}")))?;

        if !response.status().is_success() {
            return Err(ReaderError::Feed(format!("HTTP error: {}", response.status())));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(too_large(content_length, self.max_feed_size));
            }
        }

        // Chunked responses carry no Content-Length.
        let mut body = CappedBody::new(self.max_feed_size);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ReaderError::Feed(format!("failed to read response: {e}")))?
        {
            body.push(&chunk)?;
        }

        parse_feed(body.as_bytes(), self.max_content_length)
    }
}

fn too_large(size: u64, max: u64) -> ReaderError {
    ReaderError::Feed(format!("feed too large: {size} bytes (max {max} bytes)"))
}

/// Response body buffer that fails once it grows past `max` bytes.
struct CappedBody {
    bytes: Vec<u8>,
    max: u64,
}

impl CappedBody {
    fn new(max: u64) -> Self {
        Self {
            bytes: Vec::new(),
            max,
        }
    }

    fn push(&mut self, chunk: &[u8]) -> Result<()> {
        let size = (self.bytes.len() + chunk.len()) as u64;
        if size > self.max {
            return Err(too_large(size, self.max));
        }
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Check that a URL may be fetched.
///
/// Only http(s) URLs up to the length limit are accepted, and hosts that
/// resolve to private networks by name or literal address are refused.
pub fn validate_url(url: &str) -> Result<()> {
    if url.len() > MAX_URL_LENGTH {
        return Err(ReaderError::Validation(format!(
            "URL is longer than {MAX_URL_LENGTH} characters"
        )));
    }

    let parsed =
        url::Url::parse(url).map_err(|e| ReaderError::Validation(format!("invalid URL: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ReaderError::Validation(format!(
                "unsupported URL scheme: {scheme}"
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| ReaderError::Validation("URL has no host".to_string()))?;

    let ip = match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(ReaderError::Validation(format!("forbidden host: {domain}")));
            }
            return Ok(());
        }
        url::Host::Ipv4(ipv4) => IpAddr::V4(ipv4),
        url::Host::Ipv6(ipv6) => IpAddr::V6(ipv6),
    };

    if is_private_ip(&ip) {
        return Err(ReaderError::Validation(format!(
            "private IP address not allowed: {ip}"
        )));
    }
    Ok(())
}

fn is_forbidden_hostname(host: &str) -> bool {
    const FORBIDDEN_SUFFIXES: &[&str] = &[
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    let host = host.to_lowercase();
    host == "localhost" || FORBIDDEN_SUFFIXES.iter().any(|s| host.ends_with(s))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.is_documentation()
                // Carrier-grade NAT: 100.64.0.0/10
                || (o[0] == 100 && (o[1] & 0xc0) == 64)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}

/// Parse an RSS, Atom or JSON Feed document.
///
/// Entries without a link are dropped since the URL identifies an entry.
/// Content prefers the full body over the summary and is truncated to
/// `max_content_length` characters.
pub fn parse_feed(bytes: &[u8], max_content_length: usize) -> Result<ParsedFeed> {
    let feed =
        parser::parse(bytes).map_err(|e| ReaderError::Feed(format!("failed to parse feed: {e}")))?;

    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let url = alternate_link(&entry.links)?;
            let content = entry
                .content
                .and_then(|c| c.body)
                .or(entry.summary.map(|s| s.content))
                .map(|c| truncate_chars(c, max_content_length));

            Some(ParsedEntry {
                url,
                title: entry.title.map(|t| t.content),
                content,
                updated_at: entry.updated.or(entry.published),
            })
        })
        .collect();

    Ok(ParsedFeed {
        title: feed.title.map(|t| t.content),
        updated_at: feed.updated,
        homepage_url: alternate_link(&feed.links),
        entries,
    })
}

/// First link that points at the human-readable page rather than the document
/// itself.
fn alternate_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.iter().find(|l| l.rel.as_deref() != Some("self")))
        .map(|l| l.href.clone())
        .filter(|href| !href.is_empty())
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_schemes() {
        assert!(validate_url("https://example.com/feed.xml").is_ok());
        assert!(validate_url("http://example.com/feed.xml").is_ok());

        let err = validate_url("ftp://example.com/feed.xml").unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme"));
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_validate_url_length() {
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        let err = validate_url(&long).unwrap_err();
        assert!(matches!(err, ReaderError::Validation(_)));
    }

    #[test]
    fn test_validate_url_forbidden_hosts() {
        for url in [
            "http://localhost/feed.xml",
            "http://LOCALHOST:8080/feed.xml",
            "http://server.local/feed.xml",
            "http://api.internal/feed.xml",
        ] {
            let err = validate_url(url).unwrap_err();
            assert!(err.to_string().contains("forbidden host"), "{url}");
        }
        assert!(validate_url("http://localhost.example.com/feed").is_ok());
    }

    #[test]
    fn test_validate_url_private_ips() {
        for url in [
            "http://127.0.0.1/feed.xml",
            "http://10.0.0.1/feed.xml",
            "http://172.16.0.1/feed.xml",
            "http://192.168.1.1/feed.xml",
            "http://169.254.1.1/feed.xml",
            "http://100.64.0.1/feed.xml",
            "http://[::1]/feed.xml",
            "http://[fd00::1]/feed.xml",
            "http://[::ffff:127.0.0.1]/feed.xml",
        ] {
            let err = validate_url(url).unwrap_err();
            assert!(err.to_string().contains("private IP"), "{url}");
        }
        assert!(validate_url("http://172.32.0.1/feed.xml").is_ok());
        assert!(validate_url("http://93.184.216.34/feed.xml").is_ok());
    }

    #[test]
    fn test_parse_rss() {
        let rss = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com/</link>
    <description>A test feed</description>
    <item>
      <title>First Article</title>
      <link>https://example.com/1</link>
      <guid>guid-1</guid>
      <description>Summary text</description>
      <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>No link</title>
      <guid>guid-2</guid>
    </item>
  </channel>
</rss>"#;

        let feed = parse_feed(rss.as_bytes(), 10000).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Test Feed"));
        assert!(feed.homepage_url.unwrap().starts_with("https://example.com"));
        assert_eq!(feed.entries.len(), 1);

        let entry = &feed.entries[0];
        assert_eq!(entry.url, "https://example.com/1");
        assert_eq!(entry.title.as_deref(), Some("First Article"));
        assert_eq!(entry.content.as_deref(), Some("Summary text"));
        assert!(entry.updated_at.is_some());
    }

    #[test]
    fn test_parse_atom_prefers_alternate_link_and_content() {
        let atom = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <id>urn:uuid:feed</id>
  <updated>2024-02-01T00:00:00Z</updated>
  <link rel="self" href="https://example.com/atom.xml"/>
  <link rel="alternate" href="https://example.com/blog"/>
  <entry>
    <id>urn:uuid:1</id>
    <title>Atom Entry</title>
    <link rel="alternate" href="https://example.com/blog/entry"/>
    <summary>Entry summary</summary>
    <content type="html">&lt;p&gt;Full body&lt;/p&gt;</content>
    <updated>2024-01-31T12:30:00.250Z</updated>
  </entry>
</feed>"#;

        let feed = parse_feed(atom.as_bytes(), 10000).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Atom Feed"));
        assert!(feed.updated_at.is_some());
        assert_eq!(feed.homepage_url.as_deref(), Some("https://example.com/blog"));

        let entry = &feed.entries[0];
        assert_eq!(entry.url, "https://example.com/blog/entry");
        assert_eq!(entry.content.as_deref(), Some("<p>Full body</p>"));
        assert_eq!(
            entry.updated_at.map(|t| t.timestamp_subsec_millis()),
            Some(250)
        );
    }

    #[test]
    fn test_parse_truncates_content() {
        let body = "é".repeat(50);
        let rss = format!(
            r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title>
<item><link>https://example.com/a</link><description>{body}</description></item>
</channel></rss>"#
        );

        let feed = parse_feed(rss.as_bytes(), 10).unwrap();
        assert_eq!(feed.entries[0].content.as_deref(), Some("é".repeat(10).as_str()));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_feed(b"This is not XML", 10000).is_err());
    }

    #[test]
    fn test_capped_body_stops_at_limit() {
        let mut body = CappedBody::new(10);
        body.push(b"<rss>").unwrap();
        body.push(b"</rss").unwrap();
        assert_eq!(body.as_bytes(), b"<rss></rss");

        let err = body.push(b">").unwrap_err();
        assert!(err.to_string().contains("feed too large: 11 bytes (max 10 bytes)"));
        assert_eq!(body.as_bytes().len(), 10);
    }

    #[test]
    fn test_fetcher_from_config() {
        let config = FeedsConfig::default();
        assert!(FeedFetcher::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_rejects_private_host_before_connecting() {
        let fetcher = FeedFetcher::new(&FeedsConfig::default()).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:9/feed.xml").await.unwrap_err();
        assert!(matches!(err, ReaderError::Validation(_)));
    }
}
