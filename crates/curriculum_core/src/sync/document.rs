//! Document: a stored record exposed as a set of reactive properties.
//!
//! # Responsibility
//! - Own the properties bound to one stored document and mediate between them
//!   and storage.
//! - Suppress storage echo while values are repopulated from storage.
//! - Run the `start_edit` / `commit_edit` session across every property.
//!
//! # Invariants
//! - Property paths are unique within one document.
//! - While any `EchoGuard` is alive, property changes never reach storage.
//! - A failed per-property read is logged and skipped; the rest still read.

use crate::model::path::FieldPath;
use crate::model::record::{FieldUpdate, FieldValue, Record};
use crate::store::{DocRef, DocumentStore};
use crate::sync::error::{FieldWriteFailure, SyncError, SyncResult};
use crate::sync::prop::{AnyProp, Prop, PropRef, PropValue};
use log::{debug, warn};
use std::cell::Cell;
use std::rc::Rc;

/// Write channel from properties to the stored document.
pub(crate) struct SyncLink {
    store: Rc<dyn DocumentStore>,
    doc: DocRef,
    suppress_depth: Cell<u32>,
}

impl SyncLink {
    pub(crate) fn doc(&self) -> &DocRef {
        &self.doc
    }

    fn is_suppressed(&self) -> bool {
        self.suppress_depth.get() > 0
    }

    /// Echoes one changed field unless echo is suppressed.
    pub(crate) fn write_field(&self, path: &FieldPath, value: FieldValue) -> SyncResult<()> {
        if self.is_suppressed() {
            debug!(
                "event=prop_echo module=sync status=suppressed doc={} field={path}",
                self.doc
            );
            return Ok(());
        }
        self.write(&FieldUpdate::single(path.clone(), value))
    }

    pub(crate) fn write(&self, update: &FieldUpdate) -> SyncResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        match self.store.update(&self.doc, update) {
            Ok(()) => {
                debug!(
                    "event=doc_write module=sync status=ok doc={} fields={update}",
                    self.doc
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=doc_write module=sync status=error doc={} fields={update} error={err}",
                    self.doc
                );
                Err(err.into())
            }
        }
    }
}

/// Keeps storage echo disabled while alive.
///
/// Guards nest; echo resumes when the last one drops.
pub struct EchoGuard {
    link: Rc<SyncLink>,
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        let depth = self.link.suppress_depth.get();
        self.link.suppress_depth.set(depth.saturating_sub(1));
    }
}

/// Properties of one stored document.
pub struct Document {
    link: Rc<SyncLink>,
    props: Vec<Rc<dyn AnyProp>>,
}

impl Document {
    pub fn new(store: Rc<dyn DocumentStore>, doc: DocRef) -> Self {
        Self {
            link: Rc::new(SyncLink {
                store,
                doc,
                suppress_depth: Cell::new(0),
            }),
            props: Vec::new(),
        }
    }

    pub fn doc_ref(&self) -> &DocRef {
        &self.link.doc
    }

    pub fn id(&self) -> &str {
        self.link.doc.id()
    }

    pub fn store(&self) -> &Rc<dyn DocumentStore> {
        &self.link.store
    }

    /// Creates and registers a property at `path`.
    pub fn new_prop<T: PropValue>(&mut self, path: FieldPath, default: T) -> PropRef<T> {
        self.add_prop(Rc::new(Prop::new(path, default)))
    }

    /// Registers `prop`; its later changes echo to storage.
    ///
    /// A property already registered at the same path is detached and replaced.
    pub fn add_prop<T: PropValue>(&mut self, prop: PropRef<T>) -> PropRef<T> {
        if self.remove_prop(prop.path()) {
            warn!(
                "event=prop_register module=sync status=replaced doc={} field={}",
                self.link.doc,
                prop.path()
            );
        }
        prop.attach(&self.link);
        let erased: Rc<dyn AnyProp> = prop.clone();
        self.props.push(erased);
        prop
    }

    /// Unregisters the property at `path`. Returns `false` when none matched.
    pub fn remove_prop(&mut self, path: &FieldPath) -> bool {
        let Some(index) = self.props.iter().position(|prop| prop.path() == path) else {
            return false;
        };
        let prop = self.props.remove(index);
        prop.detach();
        true
    }

    /// Unregisters every property at or below `prefix`; returns how many.
    pub fn remove_props_under(&mut self, prefix: &FieldPath) -> usize {
        let before = self.props.len();
        self.props.retain(|prop| {
            let matched = prop.path().starts_with(prefix);
            if matched {
                prop.detach();
            }
            !matched
        });
        before - self.props.len()
    }

    pub fn has_prop(&self, path: &FieldPath) -> bool {
        self.props.iter().any(|prop| prop.path() == path)
    }

    pub fn prop_paths(&self) -> impl Iterator<Item = &FieldPath> + '_ {
        self.props.iter().map(|prop| prop.path())
    }

    pub fn prop_count(&self) -> usize {
        self.props.len()
    }

    /// Disables storage echo until the returned guard drops.
    pub fn suppress_echo(&self) -> EchoGuard {
        let depth = self.link.suppress_depth.get();
        self.link.suppress_depth.set(depth + 1);
        EchoGuard {
            link: Rc::clone(&self.link),
        }
    }

    /// Whether property changes currently echo to storage.
    pub fn is_syncing(&self) -> bool {
        !self.link.is_suppressed()
    }

    /// Refreshes every property from `record` without echoing.
    pub fn read(&self, record: &Record) -> usize {
        let _guard = self.suppress_echo();
        self.read_props(record)
    }

    /// Reads every property; returns how many failed and were skipped.
    pub fn read_props(&self, record: &Record) -> usize {
        self.read_matching(record, |_| true)
    }

    /// Reads only the properties at or below `prefix`.
    pub fn read_props_under(&self, record: &Record, prefix: &FieldPath) -> usize {
        self.read_matching(record, |path| path.starts_with(prefix))
    }

    fn read_matching(&self, record: &Record, filter: impl Fn(&FieldPath) -> bool) -> usize {
        let mut failed = 0;
        for prop in self.props.iter().filter(|prop| filter(prop.path())) {
            if let Err(err) = prop.read(record) {
                failed += 1;
                warn!(
                    "event=prop_read module=sync status=error doc={} field={} error={err}",
                    self.link.doc,
                    prop.path()
                );
            }
        }
        failed
    }

    /// Primes every property's edit value.
    pub fn start_edit(&self) {
        for prop in &self.props {
            prop.start_edit();
        }
    }

    /// Commits every property's edit value.
    ///
    /// Each changed field writes independently; all properties commit even when
    /// an earlier write failed.
    ///
    /// # Errors
    /// - `SyncError::PartialCommit` listing every failed field.
    pub fn commit_edit(&self) -> SyncResult<()> {
        let failures: Vec<FieldWriteFailure> = self
            .props
            .iter()
            .filter_map(|prop| {
                prop.commit_edit().err().map(|error| FieldWriteFailure {
                    path: prop.path().to_string(),
                    error,
                })
            })
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SyncError::PartialCommit(failures))
        }
    }

    /// Writes a multi-field update regardless of echo suppression.
    pub fn write(&self, update: &FieldUpdate) -> SyncResult<()> {
        self.link.write(update)
    }

    /// Loads the stored record of this document.
    pub fn fetch(&self) -> SyncResult<Record> {
        self.link
            .store
            .get(&self.link.doc)?
            .ok_or_else(|| SyncError::NotFound(self.link.doc.clone()))
    }

    pub(crate) fn link(&self) -> &Rc<SyncLink> {
        &self.link
    }
}
