//! In-memory store used by tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use super::{
    sort_documents, watch_collection, Document, DocumentPath, Fields, Query, RemoteStore,
    SnapshotStream, StoreError,
};

const CHANGE_BUFFER: usize = 256;

/// In-memory realtime store.
///
/// While offline, writes apply locally and are visible to reads and
/// subscriptions at once, but their acknowledgement is held until
/// [`MemoryStore::set_online`] turns the connection back on. That is how a
/// store with an offline queue behaves when the server never answers.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Fields>>>,
    changes: broadcast::Sender<String>,
    online: watch::Sender<bool>,
    write_failure: Mutex<Option<String>>,
    subscribe_failure: Mutex<Option<String>>,
    mutation_calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        let (online, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner {
                collections: Mutex::new(BTreeMap::new()),
                changes,
                online,
                write_failure: Mutex::new(None),
                subscribe_failure: Mutex::new(None),
                mutation_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Switches the simulated connection. Held acknowledgements resolve when it
    /// comes back.
    pub fn set_online(&self, online: bool) {
        self.inner.online.send_replace(online);
    }

    /// Makes every subsequent write fail with `reason` (`None` to clear).
    pub fn fail_writes(&self, reason: Option<&str>) {
        *self.inner.write_failure.lock() = reason.map(str::to_string);
    }

    /// Makes every subsequent subscription fail with `reason` (`None` to clear).
    pub fn fail_subscriptions(&self, reason: Option<&str>) {
        *self.inner.subscribe_failure.lock() = reason.map(str::to_string);
    }

    /// Number of `set`/`delete` calls received, including queued and failed ones.
    pub fn mutation_calls(&self) -> usize {
        self.inner.mutation_calls.load(Ordering::SeqCst)
    }

    /// Writes a document directly, bypassing the offline queue and counters.
    pub fn insert(&self, path: &DocumentPath, fields: Fields) {
        self.apply_set(path, fields);
    }

    fn apply_set(&self, path: &DocumentPath, fields: Fields) {
        let now = Utc::now();
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k, v.resolve(now)))
            .collect();
        self.inner
            .collections
            .lock()
            .entry(path.collection().as_str().to_string())
            .or_default()
            .insert(path.id().to_string(), fields);
        let _ = self.inner.changes.send(path.collection().as_str().to_string());
    }

    fn apply_delete(&self, path: &DocumentPath) {
        let removed = self
            .inner
            .collections
            .lock()
            .get_mut(path.collection().as_str())
            .and_then(|docs| docs.remove(path.id()))
            .is_some();
        if removed {
            let _ = self.inner.changes.send(path.collection().as_str().to_string());
        }
    }

    fn snapshot(inner: &Inner, query: &Query) -> Vec<Document> {
        let mut docs: Vec<Document> = inner
            .collections
            .lock()
            .get(query.collection.as_str())
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        sort_documents(&mut docs, query.order_by.as_deref());
        docs
    }

    fn begin_mutation(&self) -> Result<(), StoreError> {
        self.inner.mutation_calls.fetch_add(1, Ordering::SeqCst);
        match self.inner.write_failure.lock().clone() {
            Some(reason) => Err(StoreError::Rejected(reason)),
            None => Ok(()),
        }
    }

    async fn acknowledged(&self) {
        let mut online = self.inner.online.subscribe();
        let _ = online.wait_for(|up| *up).await;
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        Ok(Self::snapshot(&self.inner, query))
    }

    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        let fields = self
            .inner
            .collections
            .lock()
            .get(path.collection().as_str())
            .and_then(|docs| docs.get(path.id()).cloned());
        Ok(fields.map(|fields| Document {
            id: path.id().to_string(),
            fields,
        }))
    }

    async fn set(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError> {
        self.begin_mutation()?;
        self.apply_set(path, fields);
        self.acknowledged().await;
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.begin_mutation()?;
        self.apply_delete(path);
        self.acknowledged().await;
        Ok(())
    }

    fn subscribe(&self, query: Query) -> SnapshotStream {
        if let Some(reason) = self.inner.subscribe_failure.lock().clone() {
            return stream::once(async move { Err(StoreError::Unavailable(reason)) }).boxed();
        }
        let inner = Arc::clone(&self.inner);
        let changes = self.inner.changes.subscribe();
        watch_collection(changes, query, move |q| Ok(Self::snapshot(&inner, q)))
    }
}
