//! Curriculum entities built from synced properties and ordered collections.
//!
//! # Responsibility
//! - Declare the fixed field set of units, activities and their elements.
//! - Provide one-shot (snapshot) and live (push-subscribed) loading.
//!
//! # Invariants
//! - Collections are reconciled before scalar properties are read, and the
//!   order is published last, so every ordered key has a live element.
//! - A live entity owns its subscription; dropping the entity releases it.

mod activity;
mod criterion;
mod location;
mod resource;
mod unit;

pub use activity::{Activity, ActivityInput, ActivitySummary, ActivityType};
pub use criterion::{Criterion, CriterionInput, CriterionType};
pub use location::{Location, LocationInput};
pub use resource::{Resource, ResourceInput, ResourceType};
pub use unit::{Unit, UnitSummary};

use crate::model::record::Record;
use crate::store::{DocRef, DocumentStore, LiveSubscription};
use crate::sync::{Document, Prop, PropValue, SyncError, SyncResult};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// How an entity follows its stored document after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Read once; later storage changes are not observed.
    Snapshot,
    /// Subscribe to pushes; they are applied by `SyncedEntity::pump`.
    Live,
}

impl SyncMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Live => "live",
        }
    }
}

impl Display for SyncMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared lifecycle of top-level documents (units, activities).
pub trait SyncedEntity: Sized {
    /// Storage collection holding this entity kind.
    const COLLECTION: &'static str;

    /// Builds an entity with every property at its default, bound to `doc`.
    fn attach(store: Rc<dyn DocumentStore>, doc: DocRef) -> Self;

    /// Refreshes the entity from a stored record without echoing.
    ///
    /// Returns how many fields failed to decode and were skipped.
    fn read(&mut self, record: &Record) -> usize;

    fn document(&self) -> &Document;

    fn subscription(&self) -> Option<&LiveSubscription>;

    fn subscription_mut(&mut self) -> &mut Option<LiveSubscription>;

    /// Loads `id` from `store`.
    ///
    /// # Errors
    /// - `SyncError::NotFound` when no such document exists.
    /// - Storage errors from the read or the subscription.
    fn open(store: Rc<dyn DocumentStore>, id: &str, mode: SyncMode) -> SyncResult<Self> {
        let doc = DocRef::new(Self::COLLECTION, id);
        let record = store
            .get(&doc)?
            .ok_or_else(|| SyncError::NotFound(doc.clone()))?;
        let mut entity = Self::attach(Rc::clone(&store), doc.clone());
        match mode {
            SyncMode::Snapshot => {
                entity.read(&record);
            }
            SyncMode::Live => {
                *entity.subscription_mut() = Some(LiveSubscription::open(store, &doc)?);
                entity.pump();
            }
        }
        info!("event=entity_open module=entity status=ok doc={doc} mode={mode}");
        Ok(entity)
    }

    /// Snapshot entity read from an already loaded record.
    fn from_record(store: Rc<dyn DocumentStore>, doc: DocRef, record: &Record) -> Self {
        let mut entity = Self::attach(store, doc);
        entity.read(record);
        entity
    }

    /// Applies every queued push, oldest first. Returns how many were applied.
    fn pump(&mut self) -> usize {
        let pushes = match self.subscription() {
            Some(subscription) => subscription.drain(),
            None => return 0,
        };
        for record in &pushes {
            let failed = self.read(record);
            if failed > 0 {
                warn!(
                    "event=entity_push module=entity status=partial doc={} failed_fields={failed}",
                    self.document().doc_ref()
                );
            }
        }
        pushes.len()
    }

    /// Cancels the live subscription. Returns `false` when not live.
    fn close(&mut self) -> bool {
        let closed = self.subscription_mut().take().is_some();
        if closed {
            debug!(
                "event=entity_close module=entity status=ok doc={}",
                self.document().doc_ref()
            );
        }
        closed
    }

    fn is_live(&self) -> bool {
        self.subscription().is_some()
    }

    fn id(&self) -> &str {
        self.document().id()
    }

    fn start_edit(&self) {
        self.document().start_edit();
    }

    fn commit_edit(&self) -> SyncResult<()> {
        self.document().commit_edit()
    }
}

/// Copies the value of `prop` into `record` under `name`, skipping unset values.
pub(crate) fn put_field<T: PropValue>(record: &mut Record, name: &str, prop: &Prop<T>) {
    match prop.to_json() {
        Ok(Some(value)) => {
            record.insert(name.to_string(), value);
        }
        Ok(None) => {}
        Err(err) => warn!("event=element_encode module=entity status=error error={err}"),
    }
}

/// Encodes an element input as the record stored for a new element.
pub(crate) fn seed_record<S: Serialize>(seed: &S) -> Record {
    match serde_json::to_value(seed) {
        Ok(Value::Object(record)) => record,
        Ok(_) => Record::new(),
        Err(err) => {
            warn!("event=element_seed module=entity status=error error={err}");
            Record::new()
        }
    }
}
