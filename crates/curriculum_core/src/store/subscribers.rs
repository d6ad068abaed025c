//! Push fan-out shared by store implementations.

use crate::model::record::Record;
use crate::store::{DocRef, SubscriptionId};
use log::debug;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Registry of open subscriptions keyed by id.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    next_id: Cell<u64>,
    entries: RefCell<BTreeMap<SubscriptionId, (DocRef, Sender<Record>)>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber for `doc` and returns its receiving end.
    ///
    /// `initial` is queued for the new subscriber only.
    pub fn add(&self, doc: &DocRef, initial: &Record) -> (SubscriptionId, Receiver<Record>) {
        let id = SubscriptionId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        let (sender, receiver) = channel();
        if sender.send(initial.clone()).is_err() {
            debug!("event=subscribe_initial module=store status=dropped doc={doc}");
        }
        self.entries.borrow_mut().insert(id, (doc.clone(), sender));
        (id, receiver)
    }

    pub fn remove(&self, id: SubscriptionId) -> bool {
        self.entries.borrow_mut().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Number of open subscriptions on one document.
    pub fn count_for(&self, doc: &DocRef) -> usize {
        self.entries
            .borrow()
            .values()
            .filter(|(target, _)| target == doc)
            .count()
    }

    /// Sends `record` to every subscriber of `doc`.
    ///
    /// Subscribers whose receiver is gone are dropped from the registry.
    pub fn publish(&self, doc: &DocRef, record: &Record) -> usize {
        let mut delivered = 0;
        let mut stale = Vec::new();
        for (id, (target, sender)) in self.entries.borrow().iter() {
            if target != doc {
                continue;
            }
            if sender.send(record.clone()).is_ok() {
                delivered += 1;
            } else {
                stale.push(*id);
            }
        }
        if !stale.is_empty() {
            let mut entries = self.entries.borrow_mut();
            for id in &stale {
                entries.remove(id);
            }
            debug!(
                "event=subscriber_prune module=store status=ok doc={doc} pruned={}",
                stale.len()
            );
        }
        delivered
    }
}
