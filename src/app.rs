use std::sync::Arc;

use crate::feed::{FeedRegistry, FeedSource, RegistryError};
use crate::loader::{FeedLoader, PendingLoad};
use crate::menu::{MenuState, MenuVisibility};

/// Application state: the feed menu plus the loader behind the entry list.
///
/// Mirrors the page behavior: on start the first feed is shown, the menu
/// icon toggles the menu, and picking a feed from the menu closes it and
/// loads that feed.
pub struct Reader<S> {
    menu: MenuVisibility,
    loader: FeedLoader<S>,
}

impl<S: FeedSource> Reader<S> {
    pub fn new(registry: FeedRegistry, source: S) -> Self {
        Self {
            menu: MenuVisibility::new(),
            loader: FeedLoader::new(Arc::new(registry), source),
        }
    }

    pub fn registry(&self) -> &FeedRegistry {
        self.loader.registry()
    }

    pub fn menu(&self) -> &MenuVisibility {
        &self.menu
    }

    pub fn loader(&self) -> &FeedLoader<S> {
        &self.loader
    }

    /// Initial load of the first feed. The registry is never empty, so this
    /// only fails if that invariant was broken.
    pub fn start(&self) -> Result<PendingLoad, RegistryError> {
        self.loader.begin(0)
    }

    /// Menu icon click.
    pub fn toggle_menu(&mut self) -> MenuState {
        self.menu.toggle()
    }

    /// Feed link click: closes the menu if open and loads feed `index`.
    ///
    /// An out-of-range index fails before the menu is touched.
    pub fn select_feed(&mut self, index: usize) -> Result<PendingLoad, RegistryError> {
        let pending = self.loader.begin(index)?;
        if !self.menu.is_hidden() {
            self.menu.toggle();
        }
        tracing::debug!(index = index, feed = %pending.feed_name(), "Feed selected from menu");
        Ok(pending)
    }
}
