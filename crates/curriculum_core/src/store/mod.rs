//! Document storage boundary.
//!
//! # Responsibility
//! - Define the document-store contract consumed by the sync layer.
//! - Provide in-memory and SQLite-backed implementations.
//! - Own push-subscription lifetimes through drop-released handles.
//!
//! # Invariants
//! - `update` never creates a document; unknown documents are `NotFound`.
//! - A new subscription receives the current record before any later change.
//! - Every `LiveSubscription` unsubscribes exactly once, when dropped.

use crate::db::DbError;
use crate::model::record::{FieldUpdate, Record};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::sync::mpsc::{Receiver, TryRecvError};
use uuid::Uuid;

mod memory;
mod sqlite;
mod subscribers;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use subscribers::SubscriberRegistry;

/// Stable document identifier inside one collection.
pub type DocId = String;

pub type StoreResult<T> = Result<T, StoreError>;

/// Reference to one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocRef {
    collection: String,
    id: DocId,
}

impl DocRef {
    pub fn new(collection: impl Into<String>, id: impl Into<DocId>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Display for DocRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Allocates a reference with a fresh store-assigned id.
pub fn new_doc_ref(collection: &str) -> DocRef {
    DocRef::new(collection, Uuid::new_v4().simple().to_string())
}

/// Storage-layer error.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound(DocRef),
    AlreadyExists(DocRef),
    /// Stored body cannot be decoded as a record.
    InvalidData(String),
    /// Backend refused or could not perform the operation.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(doc) => write!(f, "document not found: {doc}"),
            Self::AlreadyExists(doc) => write!(f, "document already exists: {doc}"),
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
            Self::Unavailable(message) => write!(f, "store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::AlreadyExists(_) => None,
            Self::InvalidData(_) => None,
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Identifier of one push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub(crate) u64);

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw subscription returned by a store: id plus the queue of pushed records.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub receiver: Receiver<Record>,
}

/// Document-oriented key/value store.
///
/// Implementations are single-threaded; pushes are queued on the
/// subscription channel and consumed by the owner's event loop.
pub trait DocumentStore {
    /// Loads one document.
    fn get(&self, doc: &DocRef) -> StoreResult<Option<Record>>;
    /// Lists every document of one collection, ordered by id.
    fn list(&self, collection: &str) -> StoreResult<Vec<(DocRef, Record)>>;
    /// Creates one document; fails when it already exists.
    fn insert(&self, doc: &DocRef, record: Record) -> StoreResult<()>;
    /// Applies a field-level partial update to an existing document.
    fn update(&self, doc: &DocRef, update: &FieldUpdate) -> StoreResult<()>;
    /// Opens a push subscription delivering the full record on every change.
    fn subscribe(&self, doc: &DocRef) -> StoreResult<Subscription>;
    /// Cancels a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Owned live subscription; dropping it cancels the subscription.
pub struct LiveSubscription {
    store: Rc<dyn DocumentStore>,
    doc: DocRef,
    id: SubscriptionId,
    receiver: Receiver<Record>,
}

impl LiveSubscription {
    pub fn open(store: Rc<dyn DocumentStore>, doc: &DocRef) -> StoreResult<Self> {
        let Subscription { id, receiver } = store.subscribe(doc)?;
        debug!("event=subscribe module=store status=ok doc={doc} subscription={id}");
        Ok(Self {
            store,
            doc: doc.clone(),
            id,
            receiver,
        })
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn doc(&self) -> &DocRef {
        &self.doc
    }

    /// Takes the next queued push, if any.
    pub fn try_next(&self) -> Option<Record> {
        match self.receiver.try_recv() {
            Ok(record) => Some(record),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Takes every queued push, oldest first.
    pub fn drain(&self) -> Vec<Record> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.store.unsubscribe(self.id);
        debug!(
            "event=unsubscribe module=store status=ok doc={} subscription={}",
            self.doc, self.id
        );
    }
}
