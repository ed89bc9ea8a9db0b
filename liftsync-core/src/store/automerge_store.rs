//! Automerge-backed local store persisted to disk.
//!
//! All collections live in one Automerge document:
//! - root map: collection path (`users/u1/trainingPlans`) -> collection map
//! - collection map: document id -> field map of scalars
//!
//! The document is saved to `<data_dir>/liftsync.automerge` after every write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use automerge::{
    transaction::Transactable, AutoCommit, AutomergeError, ObjId, ObjType, ReadDoc, ScalarValue,
    Value, ROOT,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::{
    sort_documents, watch_collection, Document, DocumentPath, FieldValue, Fields, Query,
    RemoteStore, SnapshotStream, StoreError,
};

/// File name of the persisted document inside the data directory.
pub const STORE_FILENAME: &str = "liftsync.automerge";

const CHANGE_BUFFER: usize = 256;

/// Local document store backed by a single Automerge document.
#[derive(Clone)]
pub struct AutomergeStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: Option<PathBuf>,
    doc: Mutex<AutoCommit>,
    changes: broadcast::Sender<String>,
}

impl AutomergeStore {
    /// Opens the store in `data_dir`, loading the existing document if present.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let path = data_dir.join(STORE_FILENAME);
        let doc = match fs::read(&path) {
            Ok(bytes) => AutoCommit::load(&bytes).map_err(|e| {
                StoreError::Persistence(format!("Failed to load {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => AutoCommit::new(),
            Err(e) => return Err(io_error(&path, e)),
        };
        Ok(Self::with_doc(Some(path), doc))
    }

    /// Store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::with_doc(None, AutoCommit::new())
    }

    fn with_doc(path: Option<PathBuf>, doc: AutoCommit) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            inner: Arc::new(Inner {
                path,
                doc: Mutex::new(doc),
                changes,
            }),
        }
    }

    /// Path of the persisted document, if any.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    fn mutate<F>(&self, path: &DocumentPath, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut AutoCommit, &ObjId) -> Result<(), AutomergeError>,
    {
        {
            let mut doc = self.inner.doc.lock();
            let collection = collection_obj(&mut *doc, path.collection().as_str())
                .map_err(automerge_error)?;
            change(&mut *doc, &collection).map_err(automerge_error)?;
            if let Some(file) = &self.inner.path {
                persist(file, &mut *doc)?;
            }
        }
        let _ = self.inner.changes.send(path.collection().as_str().to_string());
        Ok(())
    }

    fn read(inner: &Inner, query: &Query) -> Result<Vec<Document>, StoreError> {
        let doc = inner.doc.lock();
        let mut docs = read_collection(&doc, query.collection.as_str())?;
        sort_documents(&mut docs, query.order_by.as_deref());
        Ok(docs)
    }
}

#[async_trait]
impl RemoteStore for AutomergeStore {
    async fn get(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        Self::read(&self.inner, query)
    }

    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        let doc = self.inner.doc.lock();
        let collection = match doc
            .get(ROOT, path.collection().as_str())
            .map_err(automerge_error)?
        {
            Some((_, obj)) => obj,
            None => return Ok(None),
        };
        match doc.get(&collection, path.id()).map_err(automerge_error)? {
            Some((_, obj)) => Ok(Some(Document {
                id: path.id().to_string(),
                fields: read_fields(&doc, &obj)?,
            })),
            None => Ok(None),
        }
    }

    async fn set(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError> {
        let now = Utc::now();
        self.mutate(path, |doc, collection| {
            let obj = doc.put_object(collection, path.id(), ObjType::Map)?;
            for (key, value) in fields {
                doc.put(&obj, key.as_str(), to_scalar(value.resolve(now)))?;
            }
            Ok(())
        })
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.mutate(path, |doc, collection| {
            if doc.get(collection, path.id())?.is_some() {
                doc.delete(collection, path.id())?;
            }
            Ok(())
        })
    }

    fn subscribe(&self, query: Query) -> SnapshotStream {
        let inner = Arc::clone(&self.inner);
        let changes = self.inner.changes.subscribe();
        watch_collection(changes, query, move |q| Self::read(&inner, q))
    }
}

fn collection_obj(doc: &mut AutoCommit, collection: &str) -> Result<ObjId, AutomergeError> {
    match doc.get(ROOT, collection)? {
        Some((Value::Object(ObjType::Map), obj)) => Ok(obj),
        _ => doc.put_object(ROOT, collection, ObjType::Map),
    }
}

fn read_collection(doc: &AutoCommit, collection: &str) -> Result<Vec<Document>, StoreError> {
    let collection = match doc.get(ROOT, collection).map_err(automerge_error)? {
        Some((_, obj)) => obj,
        None => return Ok(Vec::new()),
    };

    let mut docs = Vec::new();
    for id in doc.keys(&collection) {
        if let Some((_, obj)) = doc.get(&collection, id.as_str()).map_err(automerge_error)? {
            let fields = read_fields(doc, &obj)?;
            docs.push(Document { id, fields });
        }
    }
    Ok(docs)
}

fn read_fields(doc: &AutoCommit, obj: &ObjId) -> Result<Fields, StoreError> {
    let mut fields = Fields::new();
    for key in doc.keys(obj) {
        if let Some((Value::Scalar(scalar), _)) =
            doc.get(obj, key.as_str()).map_err(automerge_error)?
        {
            fields.insert(key, from_scalar(&scalar));
        }
    }
    Ok(fields)
}

fn to_scalar(value: FieldValue) -> ScalarValue {
    match value {
        FieldValue::Null | FieldValue::ServerTimestamp => ScalarValue::Null,
        FieldValue::Bool(b) => ScalarValue::Boolean(b),
        FieldValue::Int(i) => ScalarValue::Int(i),
        FieldValue::Float(f) => ScalarValue::F64(f),
        FieldValue::Str(s) => ScalarValue::from(s.as_str()),
        FieldValue::Timestamp(t) => ScalarValue::Timestamp(t.timestamp_millis()),
    }
}

fn from_scalar(value: &ScalarValue) -> FieldValue {
    match value {
        ScalarValue::Boolean(b) => FieldValue::Bool(*b),
        ScalarValue::Int(i) => FieldValue::Int(*i),
        ScalarValue::Uint(u) => FieldValue::Int(*u as i64),
        ScalarValue::F64(f) => FieldValue::Float(*f),
        ScalarValue::Str(s) => FieldValue::Str(s.to_string()),
        ScalarValue::Timestamp(ms) => DateTime::<Utc>::from_timestamp_millis(*ms)
            .map(FieldValue::Timestamp)
            .unwrap_or(FieldValue::Null),
        _ => FieldValue::Null,
    }
}

fn persist(file: &Path, doc: &mut AutoCommit) -> Result<(), StoreError> {
    if let Some(dir) = file.parent() {
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
    }
    fs::write(file, doc.save()).map_err(|e| io_error(file, e))
}

fn io_error(path: &Path, e: io::Error) -> StoreError {
    StoreError::Persistence(format!("I/O error for {}: {}", path.display(), e))
}

fn automerge_error(e: AutomergeError) -> StoreError {
    StoreError::Persistence(format!("Automerge error: {}", e))
}
