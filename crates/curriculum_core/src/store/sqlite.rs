//! SQLite-backed document store.
//!
//! # Invariants
//! - Bodies are stored as JSON objects in `documents.body`.
//! - Partial updates are read-modify-write inside one transaction.
//! - Pushes are published only after the write committed.

use crate::db::{open_db, open_db_in_memory};
use crate::model::record::{FieldUpdate, Record};
use crate::store::{
    DocRef, DocumentStore, StoreError, StoreResult, SubscriberRegistry, Subscription,
    SubscriptionId,
};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;

/// Document store persisted in one SQLite database.
pub struct SqliteStore {
    conn: Connection,
    subscribers: SubscriberRegistry,
}

impl SqliteStore {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            subscribers: SubscriberRegistry::new(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn load_body(conn: &Connection, doc: &DocRef) -> StoreResult<Option<Record>> {
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
                params![doc.collection(), doc.id()],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|text| decode_body(doc, &text)).transpose()
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, doc: &DocRef) -> StoreResult<Option<Record>> {
        Self::load_body(&self.conn, doc)
    }

    fn list(&self, collection: &str) -> StoreResult<Vec<(DocRef, Record)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, body
             FROM documents
             WHERE collection = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([collection])?;
        let mut docs = Vec::new();
        while let Some(row) = rows.next()? {
            let doc = DocRef::new(collection, row.get::<_, String>("id")?);
            let body: String = row.get("body")?;
            let record = decode_body(&doc, &body)?;
            docs.push((doc, record));
        }
        Ok(docs)
    }

    fn insert(&self, doc: &DocRef, record: Record) -> StoreResult<()> {
        let body = encode_body(&record)?;
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO documents (collection, id, body) VALUES (?1, ?2, ?3);",
            params![doc.collection(), doc.id(), body],
        )?;
        if changed == 0 {
            return Err(StoreError::AlreadyExists(doc.clone()));
        }
        debug!("event=doc_insert module=store status=ok backend=sqlite doc={doc}");
        self.subscribers.publish(doc, &record);
        Ok(())
    }

    fn update(&self, doc: &DocRef, update: &FieldUpdate) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        let mut record =
            Self::load_body(&tx, doc)?.ok_or_else(|| StoreError::NotFound(doc.clone()))?;
        update.apply_to(&mut record);
        tx.execute(
            "UPDATE documents
             SET
                body = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE collection = ?2 AND id = ?3;",
            params![encode_body(&record)?, doc.collection(), doc.id()],
        )?;
        tx.commit()?;

        debug!(
            "event=doc_update module=store status=ok backend=sqlite doc={doc} fields={update}"
        );
        self.subscribers.publish(doc, &record);
        Ok(())
    }

    fn subscribe(&self, doc: &DocRef) -> StoreResult<Subscription> {
        let current = self.get(doc)?.unwrap_or_default();
        let (id, receiver) = self.subscribers.add(doc, &current);
        Ok(Subscription { id, receiver })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.remove(id);
    }
}

fn decode_body(doc: &DocRef, body: &str) -> StoreResult<Record> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => {
            warn!("event=doc_decode module=store status=error doc={doc} error_code=not_an_object");
            Err(StoreError::InvalidData(format!(
                "body of {doc} is not a JSON object"
            )))
        }
        Err(err) => {
            warn!("event=doc_decode module=store status=error doc={doc} error_code=invalid_json");
            Err(StoreError::InvalidData(format!(
                "body of {doc} is not valid JSON: {err}"
            )))
        }
    }
}

fn encode_body(record: &Record) -> StoreResult<String> {
    serde_json::to_string(record)
        .map_err(|err| StoreError::InvalidData(format!("record cannot be encoded: {err}")))
}
