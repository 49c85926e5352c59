use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use super::types::{Entry, FeedDescriptor};

/// Errors a [`FeedSource`] reports when it cannot produce entries.
///
/// Covers the whole fetch lifecycle for [`super::HttpSource`] (network, HTTP
/// status, size limits, parsing) plus the empty-feed case shared by every
/// source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
    /// The feed parsed but holds no entries
    #[error("Feed '{0}' has no entries")]
    Empty(String),
    /// The source could not be reached at all
    #[error("Feed source unavailable: {0}")]
    Unavailable(String),
}

/// Where a loader gets entries from.
///
/// Implementations must be shareable across tasks: the loader keeps one
/// instance behind an `Arc` and calls `fetch` from spawned tasks.
pub trait FeedSource: Send + Sync + 'static {
    /// Produces the entries of `feed`, in display order.
    fn fetch(
        &self,
        feed: &FeedDescriptor,
    ) -> impl Future<Output = Result<Vec<Entry>, SourceError>> + Send;
}

/// Deterministic offline source.
///
/// Every feed yields `Article-{name}1 ..= Article-{name}{n}`, so two feeds
/// with different names always differ in their first entry.
#[derive(Debug, Clone)]
pub struct StubSource {
    entries_per_feed: usize,
    delay: Duration,
    feed_delays: HashMap<String, Duration>,
    unreachable: HashSet<String>,
}

impl Default for StubSource {
    fn default() -> Self {
        Self::new(3)
    }
}

impl StubSource {
    /// `entries_per_feed` of zero makes every fetch fail with `Empty`.
    pub fn new(entries_per_feed: usize) -> Self {
        Self {
            entries_per_feed,
            delay: Duration::ZERO,
            feed_delays: HashMap::new(),
            unreachable: HashSet::new(),
        }
    }

    /// Sleep this long before answering, to make loads observably async.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Overrides the delay for one URL, so loads can finish out of order.
    pub fn with_feed_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.feed_delays.insert(url.into(), delay);
        self
    }

    /// Fetches of this URL fail with [`SourceError::Unavailable`].
    pub fn with_unreachable(mut self, url: impl Into<String>) -> Self {
        self.unreachable.insert(url.into());
        self
    }
}

impl FeedSource for StubSource {
    async fn fetch(&self, feed: &FeedDescriptor) -> Result<Vec<Entry>, SourceError> {
        let delay = self.feed_delays.get(feed.url()).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.unreachable.contains(feed.url()) {
            return Err(SourceError::Unavailable(feed.url().to_string()));
        }
        if self.entries_per_feed == 0 {
            return Err(SourceError::Empty(feed.name().to_string()));
        }

        let base = feed.url().trim_end_matches('/');
        Ok((1..=self.entries_per_feed)
            .map(|n| {
                let mut entry = Entry::titled(
                    format!("{}#{}", base, n),
                    format!("Article-{}{}", feed.name(), n),
                );
                entry.link = Some(format!("{}/{}", base, n));
                entry
            })
            .collect())
    }
}
