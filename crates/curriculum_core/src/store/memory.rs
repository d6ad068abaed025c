//! In-memory document store.
//!
//! Replaces process-global fixture data: one instance is created by the
//! caller and injected into every service and entity that needs it.

use crate::model::record::{FieldUpdate, Record};
use crate::store::{
    DocRef, DocumentStore, StoreError, StoreResult, SubscriberRegistry, Subscription,
    SubscriptionId,
};
use log::debug;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Document store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RefCell<BTreeMap<DocRef, Record>>,
    subscribers: SubscriberRegistry,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.borrow().is_empty()
    }

    /// Number of open push subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, doc: &DocRef) -> StoreResult<Option<Record>> {
        Ok(self.docs.borrow().get(doc).cloned())
    }

    fn list(&self, collection: &str) -> StoreResult<Vec<(DocRef, Record)>> {
        Ok(self
            .docs
            .borrow()
            .iter()
            .filter(|(doc, _)| doc.collection() == collection)
            .map(|(doc, record)| (doc.clone(), record.clone()))
            .collect())
    }

    fn insert(&self, doc: &DocRef, record: Record) -> StoreResult<()> {
        {
            let mut docs = self.docs.borrow_mut();
            if docs.contains_key(doc) {
                return Err(StoreError::AlreadyExists(doc.clone()));
            }
            docs.insert(doc.clone(), record.clone());
        }
        debug!("event=doc_insert module=store status=ok backend=memory doc={doc}");
        self.subscribers.publish(doc, &record);
        Ok(())
    }

    fn update(&self, doc: &DocRef, update: &FieldUpdate) -> StoreResult<()> {
        let snapshot = {
            let mut docs = self.docs.borrow_mut();
            let record = docs
                .get_mut(doc)
                .ok_or_else(|| StoreError::NotFound(doc.clone()))?;
            update.apply_to(record);
            record.clone()
        };
        debug!(
            "event=doc_update module=store status=ok backend=memory doc={doc} fields={update}"
        );
        self.subscribers.publish(doc, &snapshot);
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
