//! Where an activity takes place (`loc.*`).

use crate::model::path::FieldPath;
use crate::sync::{Document, PropRef};
use serde::{Deserialize, Serialize};

/// Replacement values for an activity's location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInput {
    pub name: String,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub lon: Option<String>,
}

pub struct Location {
    name: PropRef<String>,
    lat: PropRef<Option<String>>,
    lon: PropRef<Option<String>>,
}

impl Location {
    pub(crate) fn attach(doc: &mut Document) -> Self {
        let base = FieldPath::field("loc");
        Self {
            name: doc.new_prop(base.then("name"), String::new()),
            lat: doc.new_prop(base.then("lat"), None),
            lon: doc.new_prop(base.then("lon"), None),
        }
    }

    /// Place name; empty when the activity has no location.
    pub fn name(&self) -> &PropRef<String> {
        &self.name
    }

    pub fn lat(&self) -> &PropRef<Option<String>> {
        &self.lat
    }

    pub fn lon(&self) -> &PropRef<Option<String>> {
        &self.lon
    }

    pub fn is_set(&self) -> bool {
        !self.name.value().is_empty()
    }

    /// Primes edit values from `input`; `None` clears the location.
    pub(crate) fn edit_from(&self, input: Option<&LocationInput>) {
        let input = input.cloned().unwrap_or_default();
        self.name.set_edit(input.name);
        self.lat.set_edit(input.lat);
        self.lon.set_edit(input.lon);
    }
}
