use futures::stream::StreamExt;
use std::time::Duration;

use super::parser::parse_feed;
use super::source::{FeedSource, SourceError};
use super::types::{Entry, FeedDescriptor};
use crate::config::Config;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Feed source that downloads RSS/Atom over HTTP.
///
/// # Behavior
///
/// - Each attempt, headers and body together, is bounded by `timeout`
///   (30s by default)
/// - HTTP 429 and 5xx responses are retried with exponential backoff
///   (`backoff_base * 2^attempt`, so 2s, 4s, 8s by default) up to `max_retries`
/// - 4xx responses other than 429 fail immediately
/// - Bodies larger than `max_feed_size` are rejected, truncated bodies retried
/// - A feed that parses but has no items fails with [`SourceError::Empty`]
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
    max_feed_size: usize,
    backoff_base: Duration,
}

impl HttpSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            max_feed_size: DEFAULT_MAX_FEED_SIZE,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    /// Builds a client and source from the fetch settings in `config`.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("feedreader/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()?;

        Ok(Self::new(client)
            .with_timeout(Duration::from_secs(config.request_timeout_secs))
            .with_max_retries(config.max_retries)
            .with_max_feed_size(config.max_feed_size_bytes))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_feed_size(mut self, max_feed_size: usize) -> Self {
        self.max_feed_size = max_feed_size;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    fn backoff(&self, retry_count: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(retry_count))
    }

    async fn download(&self, feed: &FeedDescriptor) -> Result<Vec<u8>, SourceError> {
        let mut retry_count = 0;

        loop {
            let deadline = tokio::time::Instant::now() + self.timeout;
            let response = tokio::time::timeout_at(deadline, self.client.get(feed.url()).send())
                .await
                .map_err(|_| SourceError::Timeout)?
                .map_err(SourceError::Network)?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retry_count >= self.max_retries {
                    return Err(SourceError::RateLimited(self.max_retries));
                }
                let delay = self.backoff(retry_count);
                tracing::warn!(
                    feed = %feed.url(),
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if status.is_server_error() {
                if retry_count >= self.max_retries {
                    return Err(SourceError::HttpStatus(status.as_u16()));
                }
                let delay = self.backoff(retry_count);
                tracing::warn!(
                    feed = %feed.url(),
                    status = %status,
                    retry = retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "Server error, retrying after delay"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                return Err(SourceError::HttpStatus(status.as_u16()));
            }

            let body = tokio::time::timeout_at(
                deadline,
                read_limited_bytes(response, self.max_feed_size),
            )
            .await
            .map_err(|_| SourceError::Timeout)?;

            match body {
                Ok(bytes) => return Ok(bytes),
                Err(SourceError::IncompleteResponse { expected, received }) => {
                    if retry_count >= self.max_retries {
                        return Err(SourceError::IncompleteResponse { expected, received });
                    }
                    let delay = self.backoff(retry_count);
                    tracing::debug!(
                        feed = %feed.url(),
                        expected = expected,
                        received = received,
                        attempt = retry_count + 1,
                        "Retrying incomplete download"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl FeedSource for HttpSource {
    async fn fetch(&self, feed: &FeedDescriptor) -> Result<Vec<Entry>, SourceError> {
        let bytes = self.download(feed).await?;
        let entries = parse_feed(&bytes)?;

        if entries.is_empty() {
            return Err(SourceError::Empty(feed.name().to_string()));
        }

        tracing::debug!(
            feed = %feed.url(),
            bytes = bytes.len(),
            entries = entries.len(),
            "Fetched feed"
        );
        Ok(entries)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, SourceError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(SourceError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(SourceError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(SourceError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    // EDGE-005: a connection dropped mid-body shows up as fewer bytes than
    // Content-Length promised; the caller retries with backoff.
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(SourceError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{any, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><guid>1</guid><title>Test</title></item>
</channel></rss>"#;

    fn source() -> HttpSource {
        HttpSource::new(reqwest::Client::new()).with_backoff_base(Duration::from_millis(5))
    }

    fn feed_at(server: &MockServer) -> FeedDescriptor {
        FeedDescriptor::new("Test", format!("{}/feed", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let entries = source().fetch(&feed_at(&mock_server)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Test");
    }

    #[tokio::test]
    async fn test_fetch_404_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        match source().fetch(&feed_at(&mock_server)).await.unwrap_err() {
            SourceError::HttpStatus(404) => {}
            e => panic!("Expected HttpStatus(404), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_fetch_500_error_retries_then_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(4) // Initial request + 3 retries
            .mount(&mock_server)
            .await;

        match source().fetch(&feed_at(&mock_server)).await.unwrap_err() {
            SourceError::HttpStatus(500) => {}
            e => panic!("Expected HttpStatus(500), got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_fetch_503_retry_then_success() {
        let mock_server = MockServer::start().await;

        // First two requests return 503, third succeeds
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let entries = source().fetch(&feed_at(&mock_server)).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_429_exhausts_retries() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&mock_server)
            .await;

        let err = source()
            .with_max_retries(1)
            .fetch(&feed_at(&mock_server))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::RateLimited(1)));
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        match source().fetch(&feed_at(&mock_server)).await.unwrap_err() {
            SourceError::Parse(_) => {}
            e => panic!("Expected Parse error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_empty_feed_is_error() {
        let empty_rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel></channel></rss>"#;

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(empty_rss))
            .mount(&mock_server)
            .await;

        match source().fetch(&feed_at(&mock_server)).await.unwrap_err() {
            SourceError::Empty(name) => assert_eq!(name, "Test"),
            e => panic!("Expected Empty, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let err = source()
            .with_max_feed_size(16)
            .fetch(&feed_at(&mock_server))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::ResponseTooLarge));
    }

    /// Serves one response that promises a body, sends headers plus a few
    /// bytes, then never finishes.
    async fn stalled_body_server() -> String {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n<rss")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        format!("http://{}/feed", addr)
    }

    #[tokio::test]
    async fn test_stalled_body_times_out() {
        let url = stalled_body_server().await;
        let feed = FeedDescriptor::new("Stalled", url).unwrap();
        let source = source().with_timeout(Duration::from_millis(200));

        let result = tokio::time::timeout(Duration::from_secs(3), source.fetch(&feed))
            .await
            .expect("fetch should give up on its own");
        assert!(matches!(result, Err(SourceError::Timeout)));
    }

    #[tokio::test]
    async fn test_parse_error_keeps_source_chain() {
        use std::error::Error as _;

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let err = source().fetch(&feed_at(&mock_server)).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_backoff_doubles() {
        let source = HttpSource::new(reqwest::Client::new());
        assert_eq!(source.backoff(0), Duration::from_secs(2));
        assert_eq!(source.backoff(1), Duration::from_secs(4));
        assert_eq!(source.backoff(2), Duration::from_secs(8));
    }
}
