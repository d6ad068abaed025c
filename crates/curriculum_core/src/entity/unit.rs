//! Unit: a learning goal with its audience criteria.

use crate::entity::criterion::{Criterion, CriterionInput, CriterionType};
use crate::entity::{seed_record, SyncedEntity};
use crate::model::observable::Observable;
use crate::model::path::{ElementKey, FieldPath};
use crate::model::record::Record;
use crate::store::{DocRef, DocumentStore, LiveSubscription};
use crate::sync::{Document, OrderedCollection, PropRef, SyncResult, UndoDelete};
use std::rc::Rc;

/// Listing row for a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSummary {
    pub id: String,
    pub goal: String,
}

/// A unit document (`units/<id>`).
pub struct Unit {
    doc: Document,
    created: PropRef<Option<i64>>,
    goal: PropRef<Option<String>>,
    benefits: PropRef<Option<String>>,
    justification: PropRef<Option<String>>,
    criteria: OrderedCollection<Criterion>,
    live: Option<LiveSubscription>,
}

impl Unit {
    /// Creation time in epoch milliseconds.
    pub fn created(&self) -> &PropRef<Option<i64>> {
        &self.created
    }

    pub fn goal(&self) -> &PropRef<Option<String>> {
        &self.goal
    }

    pub fn benefits(&self) -> &PropRef<Option<String>> {
        &self.benefits
    }

    pub fn justification(&self) -> &PropRef<Option<String>> {
        &self.justification
    }

    /// Criteria in display order.
    pub fn criteria(&self) -> Vec<&Criterion> {
        self.criteria.elements()
    }

    /// Observable criterion order.
    pub fn criterion_order(&self) -> &Observable<Vec<ElementKey>> {
        self.criteria.order()
    }

    /// # Panics
    /// When `key` is not a live criterion.
    pub fn criterion(&self, key: &ElementKey) -> &Criterion {
        self.criteria.element(key)
    }

    pub fn criterion_count(&self) -> usize {
        self.criteria.len()
    }

    /// Appends a criterion of `kind` and returns its key.
    pub fn add_criterion(&mut self, kind: CriterionType) -> SyncResult<ElementKey> {
        self.criteria
            .add(&mut self.doc, seed_record(&CriterionInput::of(kind)))
    }

    /// Replaces every criterion with `criteria`, in order, in one update.
    pub fn replace_criteria(&mut self, criteria: &[CriterionInput]) -> SyncResult<Vec<ElementKey>> {
        let seeds = criteria.iter().map(seed_record).collect();
        self.criteria.replace_all(&mut self.doc, seeds)
    }

    pub fn delete_criterion(&mut self, key: &ElementKey) -> SyncResult<UndoDelete> {
        self.criteria.delete(&mut self.doc, key)
    }

    pub fn move_criterion(&mut self, key: &ElementKey, delta: i64) -> SyncResult<bool> {
        self.criteria.move_by(&self.doc, key, delta)
    }

    pub fn summary(&self) -> UnitSummary {
        UnitSummary {
            id: self.doc.id().to_string(),
            goal: self.goal.value().unwrap_or_default(),
        }
    }
}

impl SyncedEntity for Unit {
    const COLLECTION: &'static str = "units";

    fn attach(store: Rc<dyn DocumentStore>, doc: DocRef) -> Self {
        let mut doc = Document::new(store, doc);
        Self {
            created: doc.new_prop(FieldPath::field("created"), None),
            goal: doc.new_prop(FieldPath::field("goal"), None),
            benefits: doc.new_prop(FieldPath::field("benefits"), None),
            justification: doc.new_prop(FieldPath::field("justification"), None),
            criteria: OrderedCollection::new("crits", "critOrder"),
            doc,
            live: None,
        }
    }

    fn read(&mut self, record: &Record) -> usize {
        let _guard = self.doc.suppress_echo();
        let order = self.criteria.reconcile(&mut self.doc, record);
        let failed = self.doc.read_props(record);
        self.criteria.set_order(order);
        failed
    }

    fn document(&self) -> &Document {
        &self.doc
    }

    fn subscription(&self) -> Option<&LiveSubscription> {
        self.live.as_ref()
    }

    fn subscription_mut(&mut self) -> &mut Option<LiveSubscription> {
        &mut self.live
    }
}
