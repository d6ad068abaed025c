//! Reactive property: one individually editable, observable and synced field.
//!
//! # Responsibility
//! - Mirror one stored field (the synced value) and keep a scratch copy for edits
//!   (`edit_value`).
//! - Echo local changes of the synced value to storage as single-field updates.
//!
//! # Invariants
//! - `set` (and `commit_edit`, which goes through it) is the only local write
//!   path for the synced value; views get `value` and `observe`.
//! - `edit_value` reaches the synced value only through `commit_edit`.
//! - `read` never writes to storage.
//! - A detached property (removed from its document, or whose document was
//!   dropped) never writes to storage.

use crate::model::observable::{Observable, ObserverId};
use crate::model::path::FieldPath;
use crate::model::record::{FieldValue, Record};
use crate::sync::document::SyncLink;
use crate::sync::error::{SyncError, SyncResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Value types a `Prop` can hold.
pub trait PropValue: Clone + PartialEq + Serialize + DeserializeOwned + 'static {}

impl<T> PropValue for T where T: Clone + PartialEq + Serialize + DeserializeOwned + 'static {}

/// Shared handle to a property; the entity keeps the typed handle while its
/// document keeps a type-erased one.
pub type PropRef<T> = Rc<Prop<T>>;

/// One synchronized scalar field of a document.
pub struct Prop<T: PropValue> {
    path: FieldPath,
    default: T,
    sync: Observable<T>,
    edit: Observable<T>,
    link: RefCell<Weak<SyncLink>>,
}

impl<T: PropValue> Prop<T> {
    /// Creates a detached property holding `default`.
    pub fn new(path: FieldPath, default: T) -> Self {
        Self {
            path,
            sync: Observable::new(default.clone()),
            edit: Observable::new(default.clone()),
            default,
            link: RefCell::new(Weak::new()),
        }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Current synced value.
    pub fn value(&self) -> T {
        self.sync.get()
    }

    /// Registers `observer` on the synced value.
    pub fn observe(&self, observer: impl FnMut(&T) + 'static) -> ObserverId {
        self.sync.observe(observer)
    }

    pub fn unobserve(&self, id: ObserverId) -> bool {
        self.sync.unobserve(id)
    }

    /// Observable scratch value used by editing UIs.
    pub fn edit_value(&self) -> &Observable<T> {
        &self.edit
    }

    /// Replaces the scratch value.
    pub fn set_edit(&self, value: T) {
        self.edit.set(value);
    }

    /// Whether local changes currently reach storage.
    pub fn is_attached(&self) -> bool {
        self.link.borrow().strong_count() > 0
    }

    /// Reads this field from `record` into the synced value.
    ///
    /// An absent path yields the declared default. Never writes to storage.
    ///
    /// # Errors
    /// - `SyncError::Decode` when the stored value has the wrong shape; the
    ///   current value is kept in that case.
    pub fn read(&self, record: &Record) -> SyncResult<()> {
        let value = match self.path.lookup(record) {
            None | Some(Value::Null) => self.default.clone(),
            Some(stored) => {
                serde_json::from_value(stored.clone()).map_err(|err| SyncError::Decode {
                    path: self.path.to_string(),
                    message: err.to_string(),
                })?
            }
        };
        self.sync.set(value);
        Ok(())
    }

    /// Sets the synced value and echoes it to storage when it changed.
    pub fn set(&self, value: T) -> SyncResult<()> {
        if !self.sync.set(value) {
            return Ok(());
        }
        self.echo()
    }

    /// Primes the scratch value with the synced value.
    pub fn start_edit(&self) {
        self.edit.set(self.value());
    }

    /// Copies the scratch value into the synced value.
    ///
    /// Cancelling an edit needs no call: the scratch value is simply never committed.
    pub fn commit_edit(&self) -> SyncResult<()> {
        self.set(self.edit.get())
    }

    /// Encodes the synced value; `None` when it is unset.
    pub fn to_json(&self) -> SyncResult<Option<Value>> {
        let value = self
            .sync
            .with(|value| serde_json::to_value(value))
            .map_err(|err| SyncError::Encode {
                path: self.path.to_string(),
                message: err.to_string(),
            })?;
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    fn echo(&self) -> SyncResult<()> {
        let Some(link) = self.link.borrow().upgrade() else {
            return Ok(());
        };
        let value = self.to_json()?.unwrap_or(Value::Null);
        link.write_field(&self.path, FieldValue::from_value(value))
    }
}

/// Type-erased view of a property used by `Document`.
pub(crate) trait AnyProp {
    fn path(&self) -> &FieldPath;
    fn read(&self, record: &Record) -> SyncResult<()>;
    fn start_edit(&self);
    fn commit_edit(&self) -> SyncResult<()>;
    fn to_json(&self) -> SyncResult<Option<Value>>;
    fn attach(&self, link: &Rc<SyncLink>);
    fn detach(&self);
}

impl<T: PropValue> AnyProp for Prop<T> {
    fn path(&self) -> &FieldPath {
        Prop::path(self)
    }

    fn read(&self, record: &Record) -> SyncResult<()> {
        Prop::read(self, record)
    }

    fn start_edit(&self) {
        Prop::start_edit(self)
    }

    fn commit_edit(&self) -> SyncResult<()> {
        Prop::commit_edit(self)
    }

    fn to_json(&self) -> SyncResult<Option<Value>> {
        Prop::to_json(self)
    }

    fn attach(&self, link: &Rc<SyncLink>) {
        *self.link.borrow_mut() = Rc::downgrade(link);
    }

    fn detach(&self) {
        *self.link.borrow_mut() = Weak::new();
    }
}

#[cfg(test)]
mod tests {
    use super::Prop;
    use crate::model::path::FieldPath;
    use crate::model::record::Record;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().expect("fixture must be an object")
    }

    #[test]
    fn read_missing_path_yields_default() {
        let prop = Prop::new(FieldPath::field("goal"), Some("draft".to_string()));
        prop.set(Some("stale".to_string())).unwrap();
        prop.read(&record(json!({"benefits": "x"}))).unwrap();
        assert_eq!(prop.value(), Some("draft".to_string()));
    }

    #[test]
    fn read_decode_failure_keeps_current_value() {
        let prop = Prop::new(FieldPath::field("min"), Option::<i64>::None);
        prop.read(&record(json!({"min": 4}))).unwrap();
        let err = prop.read(&record(json!({"min": "four"}))).unwrap_err();
        assert!(err.to_string().contains("min"));
        assert_eq!(prop.value(), Some(4));
    }

    #[test]
    fn detached_commit_updates_value_without_storage() {
        let prop = Prop::new(FieldPath::field("goal"), Option::<String>::None);
        prop.start_edit();
        prop.set_edit(Some("Learn X".to_string()));
        prop.commit_edit().unwrap();
        assert!(!prop.is_attached());
        assert_eq!(prop.value(), Some("Learn X".to_string()));
    }

    #[test]
    fn observers_see_set_and_read_but_not_edits() {
        let prop = Prop::new(FieldPath::field("goal"), Option::<String>::None);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = prop.observe(move |value: &Option<String>| sink.borrow_mut().push(value.clone()));

        prop.set(Some("a".to_string())).unwrap();
        prop.set_edit(Some("draft".to_string()));
        prop.read(&record(json!({"goal": "b"}))).unwrap();
        assert!(prop.unobserve(id));
        prop.set(None).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[test]
    fn to_json_treats_none_as_unset() {
        let prop = Prop::new(FieldPath::field("text"), Option::<String>::None);
        assert_eq!(prop.to_json().unwrap(), None);
        prop.set(Some("robots".to_string())).unwrap();
        assert_eq!(prop.to_json().unwrap(), Some(json!("robots")));
    }
}
