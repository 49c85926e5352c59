//! Asynchronous feed loading into the displayed-entries slot.
//!
//! A load validates its index synchronously, then fetches in a spawned task,
//! replaces the displayed feed wholesale and only then reports completion.
//! Completion travels over a oneshot channel, so every started load resolves
//! exactly once: with its summary, the source error, or
//! [`LoadError::Interrupted`] if the task died first.

use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::{oneshot, watch};

use crate::feed::{Entry, FeedDescriptor, FeedRegistry, FeedSource, RegistryError, SourceError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Load of feed '{0}' ended without reporting completion")]
    Interrupted(String),
}

/// Outcome of a load that reached completion.
pub type LoadOutcome = Result<LoadSummary, LoadError>;

/// What a successful load put on display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub index: usize,
    pub feed_name: String,
    pub entries: usize,
}

/// The "currently displayed feed" slot. Empty until the first successful load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayedFeed {
    pub index: Option<usize>,
    pub title: String,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Idle,
    Loading,
}

struct Inner<S> {
    registry: Arc<FeedRegistry>,
    source: S,
    displayed: watch::Sender<Arc<DisplayedFeed>>,
    in_flight: AtomicUsize,
}

impl<S: FeedSource> Inner<S> {
    async fn run(&self, index: usize, feed: &FeedDescriptor) -> LoadOutcome {
        tracing::debug!(index = index, feed = %feed.name(), "Loading feed");

        let entries = match self.source.fetch(feed).await {
            Ok(entries) if entries.is_empty() => {
                return Err(SourceError::Empty(feed.name().to_string()).into());
            }
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    index = index,
                    feed = %feed.url(),
                    error = %e,
                    "Feed load failed, keeping displayed entries"
                );
                return Err(e.into());
            }
        };

        let count = entries.len();
        self.displayed.send_replace(Arc::new(DisplayedFeed {
            index: Some(index),
            title: feed.name().to_string(),
            entries,
        }));
        tracing::debug!(index = index, entries = count, "Feed displayed");

        Ok(LoadSummary {
            index,
            feed_name: feed.name().to_string(),
            entries: count,
        })
    }
}

/// Keeps `in_flight` accurate even if the load task panics.
struct InFlight<S> {
    inner: Arc<Inner<S>>,
}

impl<S> InFlight<S> {
    fn enter(inner: Arc<Inner<S>>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Self { inner }
    }
}

impl<S> Drop for InFlight<S> {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Loads feeds from a registry through a [`FeedSource`].
///
/// Cheap to clone; clones share the registry, source and displayed slot,
/// which is what lets a completion callback issue the next load.
pub struct FeedLoader<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for FeedLoader<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: FeedSource> FeedLoader<S> {
    pub fn new(registry: Arc<FeedRegistry>, source: S) -> Self {
        let (displayed, _) = watch::channel(Arc::new(DisplayedFeed::default()));
        Self {
            inner: Arc::new(Inner {
                registry,
                source,
                displayed,
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.inner.registry
    }

    /// Starts loading feed `index` and returns a handle that resolves once
    /// the displayed slot has been updated (or the load failed).
    ///
    /// # Errors
    ///
    /// [`RegistryError::OutOfRange`] if `index` is not a valid registry
    /// index. Nothing is spawned in that case.
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin(&self, index: usize) -> Result<PendingLoad, RegistryError> {
        let feed = self.inner.registry.get(index)?.clone();
        let feed_name = feed.name().to_string();
        let (tx, rx) = oneshot::channel();

        let guard = InFlight::enter(Arc::clone(&self.inner));
        tokio::spawn(async move {
            let outcome = guard.inner.run(index, &feed).await;
            drop(guard);
            // A dropped handle means nobody is waiting; the slot is already updated.
            let _ = tx.send(outcome);
        });

        Ok(PendingLoad {
            index,
            feed_name,
            rx,
        })
    }

    /// Callback form of [`begin`](Self::begin): `on_complete` runs exactly
    /// once, after the displayed slot reflects this load.
    ///
    /// Out-of-range indices fail here and `on_complete` is never called.
    pub fn load<F>(&self, index: usize, on_complete: F) -> Result<(), RegistryError>
    where
        F: FnOnce(LoadOutcome) + Send + 'static,
    {
        let pending = self.begin(index)?;
        tokio::spawn(async move {
            on_complete(pending.await);
        });
        Ok(())
    }

    /// Snapshot of the displayed feed.
    pub fn displayed(&self) -> Arc<DisplayedFeed> {
        Arc::clone(&self.inner.displayed.borrow())
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.inner.displayed.borrow().entries.clone()
    }

    pub fn entry_count(&self) -> usize {
        self.inner.displayed.borrow().entries.len()
    }

    pub fn first_entry_text(&self) -> Option<String> {
        self.inner
            .displayed
            .borrow()
            .entries
            .first()
            .map(Entry::text_content)
    }

    /// Receiver that is notified each time the displayed feed is replaced.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DisplayedFeed>> {
        self.inner.displayed.subscribe()
    }

    pub fn state(&self) -> LoaderState {
        if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
            LoaderState::Idle
        } else {
            LoaderState::Loading
        }
    }
}

/// Handle to a started load. Resolves exactly once.
#[derive(Debug)]
pub struct PendingLoad {
    index: usize,
    feed_name: String,
    rx: oneshot::Receiver<LoadOutcome>,
}

impl PendingLoad {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn feed_name(&self) -> &str {
        &self.feed_name
    }
}

impl Future for PendingLoad {
    type Output = LoadOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(LoadError::Interrupted(self.feed_name.clone()))),
            Poll::Pending => Poll::Pending,
        }
    }
}
