//! Ordered collections of nested elements (criteria, resources).
//!
//! A collection is stored as two sibling fields of its document: an element
//! map (`crits: {"1": {...}, "2": {...}}`) and an advisory order array
//! (`critOrder: ["2", "1"]`). Storage decides which elements exist; the order
//! array only decides how they are displayed and repairs itself on every read.
//!
//! # Invariants
//! - After reconciliation the order holds exactly the live keys, each once.
//! - Keys missing from the stored order are appended in key order.
//! - Stale or duplicate order entries are dropped, never reported as errors.
//! - New keys are `max(every numeric key seen) + 1` and are not reused within
//!   the lifetime of the collection.

use crate::model::observable::Observable;
use crate::model::path::{ElementKey, FieldPath};
use crate::model::record::{FieldUpdate, FieldValue, Record};
use crate::sync::document::{Document, SyncLink};
use crate::sync::error::{SyncError, SyncResult};
use log::debug;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Capability required from collection elements.
pub trait ListElement: Sized {
    /// Builds a live element bound to `base.<key>`, registering its
    /// properties with `doc`.
    fn attach(doc: &mut Document, base: &FieldPath, key: ElementKey) -> Self;

    fn key(&self) -> &ElementKey;

    /// Detaches the element's properties from `doc`.
    fn deleted(&self, doc: &mut Document);

    /// Current field values; unset fields are omitted.
    fn to_record(&self) -> Record;
}

/// Undo for one `OrderedCollection::delete`.
///
/// Consumed by `apply`, so one delete is undone at most once.
#[must_use = "dropping the undo discards the only way to restore the element"]
pub struct UndoDelete {
    link: Rc<SyncLink>,
    restore: FieldUpdate,
}

impl UndoDelete {
    /// Re-writes the deleted element and the prior order to storage.
    ///
    /// The element reappears locally on the next read of the document.
    pub fn apply(self) -> SyncResult<()> {
        debug!(
            "event=undo_delete module=sync status=start doc={} fields={}",
            self.link.doc(),
            self.restore
        );
        self.link.write(&self.restore)
    }

    /// Fields the undo will write.
    pub fn restore_update(&self) -> &FieldUpdate {
        &self.restore
    }
}

/// Element map plus observable display order.
pub struct OrderedCollection<E: ListElement> {
    elems_path: FieldPath,
    order_path: FieldPath,
    elems: BTreeMap<ElementKey, E>,
    order: Observable<Vec<ElementKey>>,
    high_water: u64,
}

impl<E: ListElement> OrderedCollection<E> {
    /// Collection stored under `elems_field` with order array `order_field`.
    pub fn new(elems_field: &'static str, order_field: &'static str) -> Self {
        Self {
            elems_path: FieldPath::field(elems_field),
            order_path: FieldPath::field(order_field),
            elems: BTreeMap::new(),
            order: Observable::new(Vec::new()),
            high_water: 0,
        }
    }

    pub fn elems_path(&self) -> &FieldPath {
        &self.elems_path
    }

    pub fn order_path(&self) -> &FieldPath {
        &self.order_path
    }

    /// Observable display order; the view iterates this.
    pub fn order(&self) -> &Observable<Vec<ElementKey>> {
        &self.order
    }

    pub fn keys(&self) -> Vec<ElementKey> {
        self.order.get()
    }

    pub fn len(&self) -> usize {
        self.order.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &ElementKey) -> bool {
        self.elems.contains_key(key)
    }

    pub fn get(&self, key: &ElementKey) -> Option<&E> {
        self.elems.get(key)
    }

    /// Returns the element for `key`.
    ///
    /// # Panics
    /// When `key` is not live; holding such a key is a caller bug.
    pub fn element(&self, key: &ElementKey) -> &E {
        match self.elems.get(key) {
            Some(elem) => elem,
            None => panic!("collection `{}` has no element `{key}`", self.elems_path),
        }
    }

    /// Live elements in display order.
    ///
    /// # Panics
    /// When the order references a key without element (broken invariant).
    pub fn elements(&self) -> Vec<&E> {
        self.order
            .with(|order| order.iter().map(|key| self.element(key)).collect())
    }

    /// Next key for a locally added element.
    ///
    /// # Errors
    /// - `SyncError::KeysExhausted` when the largest numeric key seen is `u64::MAX`.
    pub fn next_key(&self) -> SyncResult<ElementKey> {
        let live_max = self
            .elems
            .keys()
            .chain(self.order.with(|order| order.clone()).iter())
            .filter_map(ElementKey::as_number)
            .max()
            .unwrap_or(0);
        live_max
            .max(self.high_water)
            .checked_add(1)
            .map(ElementKey::numeric)
            .ok_or_else(|| SyncError::KeysExhausted {
                collection: self.elems_path.to_string(),
            })
    }

    /// Reconciles the live elements with `record` and returns the repaired
    /// order. The caller assigns it with `set_order` once the element
    /// properties have been read.
    pub fn reconcile(&mut self, doc: &mut Document, record: &Record) -> Vec<ElementKey> {
        let raw_keys: BTreeSet<ElementKey> = self
            .elems_path
            .lookup(record)
            .and_then(Value::as_object)
            .map(|elems| elems.keys().map(|key| ElementKey::new(key.as_str())).collect())
            .unwrap_or_default();

        for key in &raw_keys {
            self.note_key(key);
            if !self.elems.contains_key(key) {
                let elem = E::attach(doc, &self.elems_path, key.clone());
                self.elems.insert(key.clone(), elem);
            }
        }

        let stale: Vec<ElementKey> = self
            .elems
            .keys()
            .filter(|key| !raw_keys.contains(*key))
            .cloned()
            .collect();
        for key in &stale {
            if let Some(elem) = self.elems.remove(key) {
                elem.deleted(doc);
            }
        }

        let mut seen = BTreeSet::new();
        let mut order: Vec<ElementKey> = self
            .order_path
            .lookup(record)
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(ElementKey::from_json).collect())
            .unwrap_or_default();
        order.retain(|key| self.elems.contains_key(key) && seen.insert(key.clone()));
        for key in self.elems.keys() {
            if !seen.contains(key) {
                order.push(key.clone());
            }
        }

        if !stale.is_empty() {
            debug!(
                "event=collection_reconcile module=sync status=ok collection={} removed={}",
                self.elems_path,
                stale.len()
            );
        }
        order
    }

    /// Publishes a reconciled order to observers.
    pub fn set_order(&self, order: Vec<ElementKey>) {
        self.order.set(order);
    }

    /// Adds an element seeded with `seed` and persists it with the new order.
    ///
    /// The element is visible locally before the write completes. On write
    /// failure it stays visible until the next read drops it.
    ///
    /// # Errors
    /// - `SyncError::KeysExhausted` before anything changes locally.
    /// - Storage write failures.
    pub fn add(&mut self, doc: &mut Document, seed: Record) -> SyncResult<ElementKey> {
        let key = self.next_key()?;
        self.note_key(&key);
        let elem_path = self.elems_path.key(&key);

        let elem = E::attach(doc, &self.elems_path, key.clone());
        let mut scratch = Record::new();
        FieldUpdate::single(elem_path.clone(), FieldValue::Set(Value::Object(seed.clone())))
            .apply_to(&mut scratch);
        {
            let _guard = doc.suppress_echo();
            doc.read_props_under(&scratch, &elem_path);
        }
        self.elems.insert(key.clone(), elem);

        let mut order = self.order.get();
        order.push(key.clone());
        let update = FieldUpdate::new()
            .set(elem_path, Value::Object(seed))
            .set(self.order_path.clone(), keys_to_json(&order));
        self.order.set(order);

        doc.write(&update)?;
        Ok(key)
    }

    /// Replaces every element with new ones seeded from `seeds`, in order,
    /// through one storage update. Returns the new keys.
    ///
    /// Replacement elements get fresh keys; no key of a replaced element is reused.
    ///
    /// # Errors
    /// - `SyncError::KeysExhausted` before anything changes locally.
    /// - Storage write failures; the replacement is already visible locally.
    pub fn replace_all(
        &mut self,
        doc: &mut Document,
        seeds: Vec<Record>,
    ) -> SyncResult<Vec<ElementKey>> {
        let mut keys = Vec::with_capacity(seeds.len());
        for _ in &seeds {
            let key = self.next_key()?;
            self.note_key(&key);
            keys.push(key);
        }

        for (_, elem) in std::mem::take(&mut self.elems) {
            elem.deleted(doc);
        }

        let mut elems = serde_json::Map::new();
        for (key, seed) in keys.iter().zip(seeds) {
            elems.insert(key.as_str().to_string(), Value::Object(seed));
            let elem = E::attach(doc, &self.elems_path, key.clone());
            self.elems.insert(key.clone(), elem);
        }
        let mut update = FieldUpdate::new().set(self.elems_path.clone(), Value::Object(elems));
        update.push(
            self.order_path.clone(),
            FieldValue::from_value(keys_to_json(&keys)),
        );

        let mut scratch = Record::new();
        update.apply_to(&mut scratch);
        {
            let _guard = doc.suppress_echo();
            doc.read_props_under(&scratch, &self.elems_path);
        }
        self.order.set(keys.clone());

        debug!(
            "event=collection_replace module=sync status=ok doc={} collection={} count={}",
            doc.doc_ref(),
            self.elems_path,
            keys.len()
        );
        doc.write(&update)?;
        Ok(keys)
    }

    /// Deletes `key` locally and in storage.
    ///
    /// # Errors
    /// - `SyncError::UnknownElement` when `key` is neither live nor ordered.
    /// - Storage write failures; the element is already gone locally.
    pub fn delete(&mut self, doc: &mut Document, key: &ElementKey) -> SyncResult<UndoDelete> {
        let mut changes = FieldUpdate::new();
        let mut restore = FieldUpdate::new();

        if let Some(elem) = self.elems.remove(key) {
            let elem_path = self.elems_path.key(key);
            changes.push(elem_path.clone(), FieldValue::Delete);
            restore.push(elem_path, FieldValue::Set(Value::Object(elem.to_record())));
            elem.deleted(doc);
        }

        let mut order = self.order.get();
        if let Some(position) = order.iter().position(|candidate| candidate == key) {
            restore.push(self.order_path.clone(), FieldValue::Set(keys_to_json(&order)));
            order.remove(position);
            changes.push(
                self.order_path.clone(),
                FieldValue::from_value(keys_to_json(&order)),
            );
            self.order.set(order);
        }

        if changes.is_empty() {
            return Err(self.unknown(key));
        }
        doc.write(&changes)?;
        Ok(UndoDelete {
            link: Rc::clone(doc.link()),
            restore,
        })
    }

    /// Moves `key` by `delta` positions, clamped to the ends of the order.
    ///
    /// Returns `false` (and writes nothing) when the position does not change.
    pub fn move_by(&mut self, doc: &Document, key: &ElementKey, delta: i64) -> SyncResult<bool> {
        let mut order = self.order.get();
        let Some(from) = order.iter().position(|candidate| candidate == key) else {
            return Err(self.unknown(key));
        };
        let last = order.len() as i64 - 1;
        let to = (from as i64).saturating_add(delta).clamp(0, last) as usize;
        if to == from {
            return Ok(false);
        }

        let moved = order.remove(from);
        order.insert(to, moved);
        let update = FieldUpdate::new().set(self.order_path.clone(), keys_to_json(&order));
        self.order.set(order);
        doc.write(&update)?;
        Ok(true)
    }

    fn note_key(&mut self, key: &ElementKey) {
        if let Some(n) = key.as_number() {
            self.high_water = self.high_water.max(n);
        }
    }

    fn unknown(&self, key: &ElementKey) -> SyncError {
        SyncError::UnknownElement {
            collection: self.elems_path.to_string(),
            key: key.clone(),
        }
    }
}

fn keys_to_json(keys: &[ElementKey]) -> Value {
    Value::Array(
        keys.iter()
            .map(|key| Value::String(key.as_str().to_string()))
            .collect(),
    )
}
