//! Live collection snapshots and the subscriptions that receive them.
//!
//! A snapshot is the full content of a collection. Every write publishes a new one that
//! replaces the previous list wholesale; subscribers never see a partially patched list.

use super::Collection;
use crate::errors::{Error, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Full content of a collection at one point in time.
#[derive(Debug)]
pub struct Snapshot<T> {
    documents: Arc<[T]>,
    loaded: bool,
    error: Option<String>,
}

// Manual impl: cloning only bumps the `Arc`, so `T` does not need to be `Clone`.
impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            documents: Arc::clone(&self.documents),
            loaded: self.loaded,
            error: self.error.clone(),
        }
    }
}

impl<T> Snapshot<T> {
    /// Placeholder published before the first load completes.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            documents: Arc::from(Vec::new()),
            loaded: false,
            error: None,
        }
    }

    /// Successfully loaded collection contents.
    #[must_use]
    pub fn loaded(documents: Vec<T>) -> Self {
        Self {
            documents: Arc::from(documents),
            loaded: true,
            error: None,
        }
    }

    /// Keeps the last good documents and records why the refresh failed.
    #[must_use]
    pub fn with_error(&self, error: String) -> Self {
        Self {
            documents: Arc::clone(&self.documents),
            loaded: true,
            error: Some(error),
        }
    }

    /// Documents in this snapshot
    #[must_use]
    pub fn documents(&self) -> &[T] {
        &self.documents
    }

    /// Shared handle to the documents, for readers that outlive the snapshot
    #[must_use]
    pub fn shared(&self) -> Arc<[T]> {
        Arc::clone(&self.documents)
    }

    /// Whether the initial load has completed
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Error from the most recent refresh, if it failed
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the collection is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Receiving end of a live collection feed.
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`]) releases it.
pub struct Subscription<T> {
    collection: Collection,
    rx: watch::Receiver<Snapshot<T>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(collection: Collection, rx: watch::Receiver<Snapshot<T>>) -> Self {
        debug!("Subscribed to {}", collection);
        Self { collection, rx }
    }

    /// Collection this subscription follows
    #[must_use]
    pub const fn collection(&self) -> Collection {
        self.collection
    }

    /// Latest snapshot, marking it as seen.
    pub fn current(&mut self) -> Snapshot<T> {
        self.rx.borrow_and_update().clone()
    }

    /// Whether a snapshot newer than the last one seen has been published.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Waits for the next published snapshot.
    ///
    /// # Errors
    /// Returns an error if the store was dropped.
    pub async fn next(&mut self) -> Result<Snapshot<T>> {
        self.rx.changed().await.map_err(|_| self.closed())?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Waits until the initial load has completed and returns that snapshot.
    ///
    /// # Errors
    /// Returns an error if the store was dropped before loading.
    pub async fn wait_until_loaded(&mut self) -> Result<Snapshot<T>> {
        let collection = self.collection;
        let snapshot = self
            .rx
            .wait_for(Snapshot::is_loaded)
            .await
            .map_err(|_| Error::Config {
                message: format!("{collection} feed closed before loading"),
            })?
            .clone();
        Ok(snapshot)
    }

    /// Releases the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }

    fn closed(&self) -> Error {
        Error::Config {
            message: format!("{} feed closed", self.collection),
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        debug!("Unsubscribed from {}", self.collection);
    }
}
