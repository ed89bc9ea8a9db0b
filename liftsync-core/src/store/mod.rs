//! Remote document store abstraction.
//!
//! The coordinator consumes a realtime, hierarchical document store through
//! [`RemoteStore`]. Two implementations live here:
//! - [`MemoryStore`]: in-process fake with a switchable offline queue and
//!   injectable failures, used by tests.
//! - [`AutomergeStore`]: a single Automerge document persisted to disk, used
//!   by the command-line front end.
//!
//! # Snapshots
//!
//! `subscribe` yields the collection's current contents first and then one
//! snapshot per change to that collection, in the order the store applies
//! them.

mod automerge_store;
mod fields;
mod memory;
mod paths;
mod record;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

pub use automerge_store::AutomergeStore;
pub use fields::{FieldValue, Fields};
pub use memory::MemoryStore;
pub use paths::{CollectionPath, DocumentPath};
pub use record::{decode_snapshot, DecodeError, Record};

pub(crate) use record::FieldReader;

/// Stream of collection snapshots delivered by [`RemoteStore::subscribe`].
pub type SnapshotStream = BoxStream<'static, Result<Vec<Document>, StoreError>>;

/// A stored document: its id within the collection plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// A collection read, optionally sorted by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: CollectionPath,
    pub order_by: Option<String>,
}

impl Query {
    pub fn new(collection: CollectionPath) -> Self {
        Self {
            collection,
            order_by: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }
}

/// Errors reported by a store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Rejected(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Realtime hierarchical document store.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    async fn get(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError>;

    /// Creates or replaces the document at `path`.
    async fn set(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError>;

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError>;

    fn subscribe(&self, query: Query) -> SnapshotStream;

    /// Client-side id for a document that has not been written yet.
    fn new_document_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Sorts documents for `order_by`; documents without the field come first,
/// ties (and unsorted queries) fall back to document id.
pub(crate) fn sort_documents(docs: &mut [Document], order_by: Option<&str>) {
    match order_by {
        Some(field) => docs.sort_by(|a, b| {
            let left = a.fields.get(field).unwrap_or(&FieldValue::Null);
            let right = b.fields.get(field).unwrap_or(&FieldValue::Null);
            left.sort_cmp(right).then_with(|| a.id.cmp(&b.id))
        }),
        None => docs.sort_by(|a, b| a.id.cmp(&b.id)),
    }
}

/// Builds a snapshot stream from a change feed of collection paths.
///
/// The receiver must be created before `snapshot` first runs so no change
/// between the initial read and the first `recv` is lost.
pub(crate) fn watch_collection<F>(
    changes: broadcast::Receiver<String>,
    query: Query,
    snapshot: F,
) -> SnapshotStream
where
    F: Fn(&Query) -> Result<Vec<Document>, StoreError> + Send + 'static,
{
    let initial = snapshot(&query);
    let updates = stream::unfold(
        (changes, query, snapshot),
        |(mut changes, query, snapshot)| async move {
            loop {
                match changes.recv().await {
                    Ok(path) if path == query.collection.as_str() => break,
                    Ok(_) => continue,
                    // Missed notifications: re-read rather than guess which.
                    Err(broadcast::error::RecvError::Lagged(_)) => break,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
            let next = snapshot(&query);
            Some((next, (changes, query, snapshot)))
        },
    );

    stream::once(futures::future::ready(initial))
        .chain(updates)
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, order: FieldValue) -> Document {
        let mut fields = Fields::new();
        fields.insert("order".to_string(), order);
        Document {
            id: id.to_string(),
            fields,
        }
    }

    #[test]
    fn test_sort_nulls_first_then_ascending() {
        let mut docs = vec![
            doc("c", FieldValue::Int(1)),
            doc("a", FieldValue::Int(0)),
            doc("b", FieldValue::Null),
        ];
        sort_documents(&mut docs, Some("order"));
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sort_ties_by_id() {
        let mut docs = vec![doc("z", FieldValue::Int(1)), doc("y", FieldValue::Int(1))];
        sort_documents(&mut docs, Some("order"));
        assert_eq!(docs[0].id, "y");
    }

    #[test]
    fn test_unsorted_query_uses_id_order() {
        let mut docs = vec![doc("b", FieldValue::Int(0)), doc("a", FieldValue::Int(9))];
        sort_documents(&mut docs, None);
        assert_eq!(docs[0].id, "a");
    }
}
