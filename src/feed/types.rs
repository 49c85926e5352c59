use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::util::validate_url;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while building or indexing the feed registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Index outside `[0, len)`. Raised before any asynchronous work starts.
    #[error("Feed index {index} out of range (registry has {len} feeds)")]
    OutOfRange { index: usize, len: usize },

    /// A registry must hold at least one feed.
    #[error("Feed registry is empty")]
    Empty,

    #[error("Feed name must not be empty")]
    EmptyName,

    #[error("Feed URL must not be empty (feed '{0}')")]
    EmptyUrl(String),

    #[error("Invalid URL for feed '{name}': {reason}")]
    InvalidUrl { name: String, reason: String },
}

// ============================================================================
// Feed Descriptor
// ============================================================================

/// Static record naming a feed and the address it is fetched from.
///
/// Both fields are non-empty and the URL is an absolute http(s) URL; the
/// only way to obtain a descriptor is through [`FeedDescriptor::new`] (or
/// deserialization, which routes through it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct FeedDescriptor {
    name: String,
    url: String,
}

#[derive(Deserialize)]
struct RawDescriptor {
    name: String,
    url: String,
}

impl TryFrom<RawDescriptor> for FeedDescriptor {
    type Error = RegistryError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        FeedDescriptor::new(raw.name, raw.url)
    }
}

impl FeedDescriptor {
    /// Validates and builds a descriptor. Surrounding whitespace is trimmed.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self, RegistryError> {
        let name = name.into().trim().to_string();
        let url = url.into().trim().to_string();

        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if url.is_empty() {
            return Err(RegistryError::EmptyUrl(name));
        }
        if let Err(e) = validate_url(&url) {
            return Err(RegistryError::InvalidUrl {
                name,
                reason: e.to_string(),
            });
        }

        Ok(Self { name, url })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for FeedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.url)
    }
}

// ============================================================================
// Entries
// ============================================================================

/// One displayable item produced by loading a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub snippet: Option<String>,
}

impl Entry {
    /// Entry with only a title; guid and link are left to the caller.
    pub fn titled(guid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            title: title.into(),
            link: None,
            published: None,
            snippet: None,
        }
    }

    /// The text a reader sees for this entry: the title, followed by the
    /// snippet on its own line when there is one.
    pub fn text_content(&self) -> String {
        match &self.snippet {
            Some(snippet) => format!("{}\n{}", self.title, snippet),
            None => self.title.clone(),
        }
    }
}
