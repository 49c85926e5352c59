//! Configuration file parser for ~/.config/feedreader/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`,
//! which carries the stock feed list. Unknown keys are ignored by serde,
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feed::{opml, FeedDescriptor, FeedRegistry, OpmlError, RegistryError};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Failed to load OPML feed list: {0}")]
    Opml(#[from] OpmlError),

    #[error("Invalid feed list: {0}")]
    Registry(#[from] RegistryError),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feeds shown in the menu, in order. Each entry is `{ name, url }`.
    pub feeds: Vec<FeedDescriptor>,

    /// Optional OPML subscription list whose feeds are appended to `feeds`.
    pub opml: Option<PathBuf>,

    /// Per-request timeout for HTTP feed fetches.
    pub request_timeout_secs: u64,

    /// Retries for 429/5xx/truncated responses.
    pub max_retries: u32,

    /// Largest accepted feed body.
    pub max_feed_size_bytes: usize,

    /// Entries produced per feed by the offline stub source.
    pub entries_per_stub_feed: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            opml: None,
            request_timeout_secs: 30,
            max_retries: 3,
            max_feed_size_bytes: 10 * 1024 * 1024,
            entries_per_stub_feed: 3,
        }
    }
}

/// The stock feed list.
pub fn default_feeds() -> Vec<FeedDescriptor> {
    [
        ("Udacity Blog", "http://blog.udacity.com/feed"),
        ("CSS Tricks", "http://feeds.feedburner.com/CssTricks"),
        ("HTML5 Rocks", "http://feeds.feedburner.com/html5rocks"),
        ("Linear Digressions", "http://feeds.feedburner.com/udacity-linear-digressions"),
    ]
    .into_iter()
    .filter_map(|(name, url)| FeedDescriptor::new(name, url).ok())
    .collect()
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "feeds",
        "opml",
        "request_timeout_secs",
        "max_retries",
        "max_feed_size_bytes",
        "entries_per_stub_feed",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML or an invalid feed entry → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text. Blank text yields defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(feeds = config.feeds.len(), opml = ?config.opml, "Loaded configuration");
        Ok(config)
    }

    /// Assembles the feed registry: configured feeds first, then OPML feeds.
    ///
    /// Fails with `RegistryError::Empty` when both sources are empty.
    pub async fn build_registry(&self) -> Result<FeedRegistry, ConfigError> {
        let mut feeds = self.feeds.clone();

        if let Some(path) = &self.opml {
            let imported = opml::parse_file(path).await?;
            tracing::info!(
                path = %path.display(),
                feeds = imported.len(),
                "Imported feeds from OPML"
            );
            feeds.extend(imported);
        }

        Ok(FeedRegistry::new(feeds)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("feedreader_config_test_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.feeds.len(), 4);
        assert_eq!(config.feeds[0].name(), "Udacity Blog");
        assert!(config.opml.is_none());
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.entries_per_stub_feed, 3);
    }

    #[test]
    fn test_default_feeds_all_named_with_urls() {
        for feed in default_feeds() {
            assert!(!feed.name().is_empty());
            assert!(!feed.url().is_empty());
        }
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedreader_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.feeds.len(), 4);
    }

    #[test]
    fn test_whitespace_only_returns_default() {
        let config = Config::from_toml("   \n  \n  ").unwrap();
        assert_eq!(config.feeds.len(), 4);
    }

    #[test]
    fn test_full_config() {
        let dir = temp_dir("full");
        let path = dir.join("config.toml");
        let content = r#"
opml = "/tmp/subscriptions.opml"
request_timeout_secs = 10
max_retries = 1
max_feed_size_bytes = 2048
entries_per_stub_feed = 5

[[feeds]]
name = "A"
url = "http://a"

[[feeds]]
name = "B"
url = "http://b"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        let names: Vec<_> = config.feeds.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(config.opml.as_deref(), Some(Path::new("/tmp/subscriptions.opml")));
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.max_feed_size_bytes, 2048);
        assert_eq!(config.entries_per_stub_feed, 5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let config = Config::from_toml("max_retries = 0\n").unwrap();
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.feeds.len(), 4);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_feed_with_empty_url_rejected() {
        let content = r#"
[[feeds]]
name = "A"
url = ""
"#;
        assert!(matches!(
            Config::from_toml(content),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let err = Config::from_toml("this is not [valid toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let config = Config::from_toml("totally_fake_key = 1\nmax_retries = 2\n").unwrap();
        assert_eq!(config.max_retries, 2);
    }

    // SEC-014: File size limit
    #[test]
    fn test_too_large_file_rejected() {
        let dir = temp_dir("too_large");
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_empty_feed_list_fails_registry() {
        let config = Config::from_toml("feeds = []\n").unwrap();
        let err = config.build_registry().await.unwrap_err();
        assert!(matches!(err, ConfigError::Registry(RegistryError::Empty)));
    }

    #[tokio::test]
    async fn test_registry_appends_opml_feeds() {
        let dir = temp_dir("opml");
        let opml_path = dir.join("feeds.opml");
        std::fs::write(
            &opml_path,
            r#"<opml><body><outline text="From OPML" xmlUrl="https://example.com/o.xml"/></body></opml>"#,
        )
        .unwrap();

        let mut config = Config::from_toml("[[feeds]]\nname = \"A\"\nurl = \"http://a\"\n").unwrap();
        config.opml = Some(opml_path);

        let registry = config.build_registry().await.unwrap();
        let names: Vec<_> = registry.all().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["A", "From OPML"]);

        std::fs::remove_dir_all(&dir).ok();
    }
}
