//! Raw document records and field-level partial updates.
//!
//! # Responsibility
//! - Define the plain nested record shape exchanged with storage.
//! - Describe multi-field partial updates with an explicit delete sentinel.
//!
//! # Invariants
//! - `FieldValue::from_value` never produces `Set(null)` or `Set([])`.
//! - Applying a delete under a missing parent is a no-op.

use crate::model::path::FieldPath;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Plain nested key/value document record.
pub type Record = Map<String, Value>;

/// New value for one field of a partial update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Set(Value),
    /// Removes the field from the stored record.
    Delete,
}

impl FieldValue {
    /// Maps unset values (`null`, `[]`) to `Delete`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Delete,
            Value::Array(items) if items.is_empty() => Self::Delete,
            other => Self::Set(other),
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete)
    }
}

/// Partial update of one document, applied field by field in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    entries: Vec<(FieldPath, FieldValue)>,
}

impl FieldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field update.
    pub fn single(path: FieldPath, value: FieldValue) -> Self {
        let mut update = Self::new();
        update.push(path, value);
        update
    }

    pub fn push(&mut self, path: FieldPath, value: FieldValue) {
        self.entries.push((path, value));
    }

    pub fn set(mut self, path: FieldPath, value: Value) -> Self {
        self.push(path, FieldValue::Set(value));
        self
    }

    pub fn delete(mut self, path: FieldPath) -> Self {
        self.push(path, FieldValue::Delete);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(FieldPath, FieldValue)] {
        &self.entries
    }

    /// Returns the value written for `path`, if this update touches it.
    pub fn get(&self, path: &FieldPath) -> Option<&FieldValue> {
        self.entries
            .iter()
            .rev()
            .find(|(candidate, _)| candidate == path)
            .map(|(_, value)| value)
    }

    /// Applies every entry to `record`.
    pub fn apply_to(&self, record: &mut Record) {
        for (path, value) in &self.entries {
            match value {
                FieldValue::Set(value) => set_at(record, path, value.clone()),
                FieldValue::Delete => delete_at(record, path),
            }
        }
    }

    /// Comma-separated list of touched paths, for logging.
    pub fn paths_summary(&self) -> String {
        self.to_string()
    }
}

impl Display for FieldUpdate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, (path, _)) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{path}")?;
        }
        Ok(())
    }
}

fn set_at(record: &mut Record, path: &FieldPath, value: Value) {
    let Some((leaf, parents)) = path.segments().split_last() else {
        return;
    };
    let mut current = record;
    for segment in parents {
        let slot = current
            .entry(segment.as_str().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => return,
        };
    }
    current.insert(leaf.as_str().to_string(), value);
}

fn delete_at(record: &mut Record, path: &FieldPath) {
    let Some((leaf, parents)) = path.segments().split_last() else {
        return;
    };
    let mut current = record;
    for segment in parents {
        current = match current.get_mut(segment.as_str()) {
            Some(Value::Object(map)) => map,
            _ => return,
        };
    }
    current.remove(leaf.as_str());
}
