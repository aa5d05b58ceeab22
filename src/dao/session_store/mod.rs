#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
pub mod path;
pub mod tree;

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::dao::storage::StorageResult;

pub use self::path::KeyPath;

/// Value observed at a path; `None` when nothing is stored there.
pub type Snapshot = Option<Value>;

/// Abstraction over the shared multi-writer key-path state tree holding sessions.
///
/// Every write replaces whole nodes (`null` deletes) and concurrent writers resolve as
/// last-writer-wins per node. Subscribers receive the full value at their path whenever a
/// write may have changed it.
pub trait SessionStore: Send + Sync {
    /// Read the current value stored at `path`.
    fn read(&self, path: KeyPath) -> BoxFuture<'static, StorageResult<Snapshot>>;

    /// Replace the value stored at `path`.
    fn set(&self, path: KeyPath, value: Value) -> BoxFuture<'static, StorageResult<()>>;

    /// Write several paths in one call. Backends that can apply the batch atomically do so;
    /// callers must not rely on it.
    fn update_many(&self, writes: Vec<(KeyPath, Value)>) -> BoxFuture<'static, StorageResult<()>>;

    /// Merge `fields` into the object at `path`, leaving unnamed children untouched.
    fn update(
        &self,
        path: KeyPath,
        fields: Map<String, Value>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let writes = fields
            .into_iter()
            .map(|(key, value)| (path.child(key), value))
            .collect();
        self.update_many(writes)
    }

    /// Start observing `path`. Dropping the returned handle ends the subscription.
    fn subscribe(&self, path: KeyPath) -> BoxFuture<'static, StorageResult<Subscription>>;

    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;

    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Live view over the value stored at one path.
#[derive(Debug)]
pub struct Subscription {
    path: KeyPath,
    receiver: watch::Receiver<Snapshot>,
}

impl Subscription {
    /// Wrap the receiving half of a backend watch channel.
    pub fn new(path: KeyPath, receiver: watch::Receiver<Snapshot>) -> Self {
        Self { path, receiver }
    }

    /// Path being observed.
    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    /// Latest snapshot delivered by the backend.
    pub fn current(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next snapshot. Returns `None` once the backend dropped the feed.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Take a snapshot that was delivered but not yet observed, without waiting.
    pub fn take_pending(&mut self) -> Option<Snapshot> {
        if !self.receiver.has_changed().unwrap_or(false) {
            return None;
        }
        Some(self.receiver.borrow_and_update().clone())
    }
}
