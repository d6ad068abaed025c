//! Typed field paths into document records.
//!
//! # Responsibility
//! - Name one field inside a nested document record without string parsing.
//! - Order element keys the way stored element maps are iterated.
//!
//! # Invariants
//! - A `FieldPath` always has at least one segment.
//! - Schema field names are `'static`; only element keys are runtime values.
//! - Numeric element keys sort numerically and before non-numeric keys.

use crate::model::record::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// Key of one element inside an ordered collection (`"1"`, `"2"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementKey(String);

impl ElementKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Builds the canonical key for sequence number `n`.
    pub fn numeric(n: u64) -> Self {
        Self(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the numeric value for pure ASCII-digit keys.
    ///
    /// Keys such as `"+1"`, `"1a"` or `""` are not numeric.
    pub fn as_number(&self) -> Option<u64> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }

    /// Decodes one entry of a stored order array.
    ///
    /// Integer entries are tolerated and converted to their string form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::new(text.as_str())),
            Value::Number(number) => number.as_u64().map(Self::numeric),
            _ => None,
        }
    }
}

impl Ord for ElementKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ElementKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for ElementKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One step of a `FieldPath`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Field declared by an entity schema.
    Field(&'static str),
    /// Element key inside a collection map.
    Key(ElementKey),
}

impl PathSegment {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Field(name) => name,
            Self::Key(key) => key.as_str(),
        }
    }
}

/// Location of one field inside a document record, e.g. `crits.3.min`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Top-level field path.
    pub fn field(name: &'static str) -> Self {
        Self {
            segments: vec![PathSegment::Field(name)],
        }
    }

    /// Child field below this path.
    pub fn then(&self, name: &'static str) -> Self {
        self.push(PathSegment::Field(name))
    }

    /// Element entry below this (collection) path.
    pub fn key(&self, key: &ElementKey) -> Self {
        self.push(PathSegment::Key(key.clone()))
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Resolves this path inside `record`.
    ///
    /// Returns `None` when any segment is missing or an intermediate value is
    /// not an object.
    pub fn lookup<'a>(&self, record: &'a Record) -> Option<&'a Value> {
        let (first, rest) = self.segments.split_first()?;
        let mut current = record.get(first.as_str())?;
        for segment in rest {
            current = current.as_object()?.get(segment.as_str())?;
        }
        Some(current)
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment.as_str())?;
        }
        Ok(())
    }
}
