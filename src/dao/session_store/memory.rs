use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::{RwLock, watch};
use tracing::trace;

use crate::dao::storage::StorageResult;

use super::{KeyPath, SessionStore, Snapshot, Subscription, tree};

/// In-process state tree used for local runs and tests.
///
/// Writes and subscriber notifications happen under the same lock, so every subscriber sees
/// snapshots in write order and a multi-path batch is observed all at once.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    root: RwLock<Value>,
    watchers: DashMap<u64, Watcher>,
    next_watcher: AtomicU64,
}

impl Default for MemoryInner {
    fn default() -> Self {
        Self {
            root: RwLock::new(Value::Object(Map::new())),
            watchers: DashMap::new(),
            next_watcher: AtomicU64::new(0),
        }
    }
}

struct Watcher {
    path: KeyPath,
    sender: watch::Sender<Snapshot>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions, pruning the ones whose handle was dropped.
    pub fn subscriber_count(&self) -> usize {
        self.inner.prune_closed();
        self.inner.watchers.len()
    }
}

impl MemoryInner {
    async fn apply(&self, writes: Vec<(KeyPath, Value)>) {
        let mut root = self.root.write().await;
        for (path, value) in &writes {
            tree::write(&mut root, path.segments(), value.clone());
        }

        self.prune_closed();
        for watcher in self.watchers.iter() {
            if !writes.iter().any(|(path, _)| path.overlaps(&watcher.path)) {
                continue;
            }

            let next = tree::get(&root, &watcher.path).cloned();
            let notified = watcher.sender.send_if_modified(|current| {
                if *current == next {
                    return false;
                }
                *current = next;
                true
            });
            if notified {
                trace!(path = %watcher.path, "notified memory store subscriber");
            }
        }
    }

    fn prune_closed(&self) {
        self.watchers.retain(|_, watcher| !watcher.sender.is_closed());
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self, path: KeyPath) -> BoxFuture<'static, StorageResult<Snapshot>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let root = inner.root.read().await;
            Ok(tree::get(&root, &path).cloned())
        })
    }

    fn set(&self, path: KeyPath, value: Value) -> BoxFuture<'static, StorageResult<()>> {
        self.update_many(vec![(path, value)])
    }

    fn update_many(&self, writes: Vec<(KeyPath, Value)>) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.apply(writes).await;
            Ok(())
        })
    }

    fn subscribe(&self, path: KeyPath) -> BoxFuture<'static, StorageResult<Subscription>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            // Holding the read lock keeps writes from slipping between snapshot and registration.
            let root = inner.root.read().await;
            let (sender, receiver) = watch::channel(tree::get(&root, &path).cloned());
            let id = inner.next_watcher.fetch_add(1, Ordering::Relaxed);
            inner.watchers.insert(
                id,
                Watcher {
                    path: path.clone(),
                    sender,
                },
            );
            drop(root);

            Ok(Subscription::new(path, receiver))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
