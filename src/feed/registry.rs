use super::types::{FeedDescriptor, RegistryError};

/// Ordered, never-empty list of the feeds that can be loaded.
///
/// Populated once at startup (see [`crate::config::Config::build_registry`])
/// and read-only afterwards. Insertion order is the index order used by
/// [`crate::loader::FeedLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRegistry {
    feeds: Vec<FeedDescriptor>,
}

impl FeedRegistry {
    pub fn new(feeds: Vec<FeedDescriptor>) -> Result<Self, RegistryError> {
        if feeds.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(Self { feeds })
    }

    /// Returns the feed at `index`, or `OutOfRange` outside `[0, len)`.
    pub fn get(&self, index: usize) -> Result<&FeedDescriptor, RegistryError> {
        self.feeds.get(index).ok_or(RegistryError::OutOfRange {
            index,
            len: self.feeds.len(),
        })
    }

    pub fn all(&self) -> &[FeedDescriptor] {
        &self.feeds
    }

    /// Number of feeds. Never zero.
    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    // Always false; kept so `len` doesn't trip clippy::len_without_is_empty.
    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &FeedDescriptor)> {
        self.feeds.iter().enumerate()
    }
}
