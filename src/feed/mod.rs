//! Feed layer: what can be loaded and where entries come from.
//!
//! - [`FeedRegistry`] - the ordered, never-empty list of configured feeds
//! - [`FeedSource`] - the seam the loader fetches through, implemented by
//!   [`StubSource`] (deterministic, offline) and [`HttpSource`] (reqwest +
//!   feed-rs)
//! - [`opml`] - OPML subscription lists as an extra registry input
//!
//! # Example
//!
//! ```
//! use feedreader::feed::{FeedDescriptor, FeedRegistry};
//!
//! let registry = FeedRegistry::new(vec![
//!     FeedDescriptor::new("A", "http://a").unwrap(),
//!     FeedDescriptor::new("B", "http://b").unwrap(),
//! ])
//! .unwrap();
//! assert_eq!(registry.get(1).unwrap().name(), "B");
//! assert!(registry.get(2).is_err());
//! ```

mod fetcher;
pub mod opml;
mod parser;
mod registry;
mod source;
mod types;

pub use fetcher::HttpSource;
pub use opml::OpmlError;
pub use parser::parse_feed;
pub use registry::FeedRegistry;
pub use source::{FeedSource, SourceError, StubSource};
pub use types::{Entry, FeedDescriptor, RegistryError};
