//! Audience criterion of a unit (`crits.<key>.*`).

use crate::entity::put_field;
use crate::model::path::{ElementKey, FieldPath};
use crate::model::record::Record;
use crate::sync::{Document, ListElement, PropRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionType {
    Age,
    Interest,
    #[default]
    Custom,
}

/// Field values for a new criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionInput {
    #[serde(rename = "type")]
    pub kind: CriterionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CriterionInput {
    pub fn of(kind: CriterionType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn age(min: i64, max: i64) -> Self {
        Self {
            kind: CriterionType::Age,
            min: Some(min),
            max: Some(max),
            text: None,
        }
    }

    pub fn interest(text: &str) -> Self {
        Self {
            kind: CriterionType::Interest,
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

/// One criterion: an age range or a free-text interest.
pub struct Criterion {
    key: ElementKey,
    prefix: FieldPath,
    kind: PropRef<CriterionType>,
    min: PropRef<Option<i64>>,
    max: PropRef<Option<i64>>,
    text: PropRef<Option<String>>,
}

impl Criterion {
    pub fn prefix(&self) -> &FieldPath {
        &self.prefix
    }

    pub fn kind(&self) -> &PropRef<CriterionType> {
        &self.kind
    }

    pub fn min(&self) -> &PropRef<Option<i64>> {
        &self.min
    }

    pub fn max(&self) -> &PropRef<Option<i64>> {
        &self.max
    }

    pub fn text(&self) -> &PropRef<Option<String>> {
        &self.text
    }
}

impl ListElement for Criterion {
    fn attach(doc: &mut Document, base: &FieldPath, key: ElementKey) -> Self {
        let prefix = base.key(&key);
        Self {
            kind: doc.new_prop(prefix.then("type"), CriterionType::default()),
            min: doc.new_prop(prefix.then("min"), None),
            max: doc.new_prop(prefix.then("max"), None),
            text: doc.new_prop(prefix.then("text"), None),
            key,
            prefix,
        }
    }

    fn key(&self) -> &ElementKey {
        &self.key
    }

    fn deleted(&self, doc: &mut Document) {
        doc.remove_props_under(&self.prefix);
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        put_field(&mut record, "type", &self.kind);
        put_field(&mut record, "min", &self.min);
        put_field(&mut record, "max", &self.max);
        put_field(&mut record, "text", &self.text);
        record
    }
}
