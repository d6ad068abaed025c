//! Learning resource attached to an activity (`rsrcs.<key>.*`).

use crate::entity::put_field;
use crate::model::path::{ElementKey, FieldPath};
use crate::model::record::Record;
use crate::sync::{Document, ListElement, PropRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    #[default]
    Page,
    Video,
    Movie,
    Book,
}

/// Field values for a new resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInput {
    #[serde(rename = "type")]
    pub kind: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(
        default,
        rename = "previewUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceInput {
    pub fn of(kind: ResourceType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn link(kind: ResourceType, url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            ..Self::of(kind)
        }
    }
}

/// Link, video or book backing an activity. Every field except the type is
/// optional; each kind of resource fills a different subset.
pub struct Resource {
    key: ElementKey,
    prefix: FieldPath,
    kind: PropRef<ResourceType>,
    url: PropRef<Option<String>>,
    preview_url: PropRef<Option<String>>,
    title: PropRef<Option<String>>,
    description: PropRef<Option<String>>,
}

impl Resource {
    pub fn kind(&self) -> &PropRef<ResourceType> {
        &self.kind
    }

    pub fn url(&self) -> &PropRef<Option<String>> {
        &self.url
    }

    pub fn preview_url(&self) -> &PropRef<Option<String>> {
        &self.preview_url
    }

    pub fn title(&self) -> &PropRef<Option<String>> {
        &self.title
    }

    pub fn description(&self) -> &PropRef<Option<String>> {
        &self.description
    }
}

impl ListElement for Resource {
    fn attach(doc: &mut Document, base: &FieldPath, key: ElementKey) -> Self {
        let prefix = base.key(&key);
        Self {
            kind: doc.new_prop(prefix.then("type"), ResourceType::default()),
            url: doc.new_prop(prefix.then("url"), None),
            preview_url: doc.new_prop(prefix.then("previewUrl"), None),
            title: doc.new_prop(prefix.then("title"), None),
            description: doc.new_prop(prefix.then("description"), None),
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
        put_field(&mut record, "url", &self.url);
        put_field(&mut record, "previewUrl", &self.preview_url);
        put_field(&mut record, "title", &self.title);
        put_field(&mut record, "description", &self.description);
        record
    }
}
