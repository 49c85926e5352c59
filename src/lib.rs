//! Core of a small RSS/Atom reader.
//!
//! - [`feed`] - the feed registry, entry types and feed sources
//! - [`menu`] - slide-out menu visibility
//! - [`loader`] - asynchronous loading into the displayed-entries slot
//! - [`app`] - the [`Reader`](app::Reader) facade tying them together
//! - [`config`] - TOML configuration and registry assembly

pub mod app;
pub mod config;
pub mod feed;
pub mod loader;
pub mod menu;
pub mod util;
