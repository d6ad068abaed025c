//! Activity: one task of a unit with its resources and optional location.

use crate::entity::location::{Location, LocationInput};
use crate::entity::resource::{Resource, ResourceInput, ResourceType};
use crate::entity::{seed_record, SyncedEntity};
use crate::model::observable::Observable;
use crate::model::path::{ElementKey, FieldPath};
use crate::model::record::Record;
use crate::store::{DocRef, DocumentStore, LiveSubscription};
use crate::sync::{Document, OrderedCollection, PropRef, SyncResult, UndoDelete};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Watch,
    #[default]
    Read,
    Consider,
    Draw,
    Write,
    Custom,
}

impl ActivityType {
    /// Human label, used when an activity has no title of its own.
    pub fn label(self) -> &'static str {
        match self {
            Self::Watch => "Watch",
            Self::Read => "Read",
            Self::Consider => "Consider",
            Self::Draw => "Draw",
            Self::Write => "Write",
            Self::Custom => "Custom",
        }
    }
}

/// Replacement content for an activity; its unit and creation time are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInput {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub intro: Option<String>,
    #[serde(default)]
    pub resources: Vec<ResourceInput>,
    #[serde(default)]
    pub location: Option<LocationInput>,
}

/// Listing row for an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySummary {
    pub id: String,
    pub kind: ActivityType,
    pub title: String,
}

/// An activity document (`activities/<id>`).
pub struct Activity {
    doc: Document,
    created: PropRef<Option<i64>>,
    unit: PropRef<Option<String>>,
    kind: PropRef<ActivityType>,
    title: PropRef<Option<String>>,
    intro: PropRef<Option<String>>,
    location: Location,
    resources: OrderedCollection<Resource>,
    live: Option<LiveSubscription>,
}

impl Activity {
    pub fn created(&self) -> &PropRef<Option<i64>> {
        &self.created
    }

    /// Id of the owning unit.
    pub fn unit(&self) -> &PropRef<Option<String>> {
        &self.unit
    }

    pub fn kind(&self) -> &PropRef<ActivityType> {
        &self.kind
    }

    pub fn title(&self) -> &PropRef<Option<String>> {
        &self.title
    }

    pub fn intro(&self) -> &PropRef<Option<String>> {
        &self.intro
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Title, or the type label when untitled.
    pub fn display_title(&self) -> String {
        match self.title.value() {
            Some(title) if !title.is_empty() => title,
            _ => self.kind.value().label().to_string(),
        }
    }

    pub fn resources(&self) -> Vec<&Resource> {
        self.resources.elements()
    }

    pub fn resource_order(&self) -> &Observable<Vec<ElementKey>> {
        self.resources.order()
    }

    /// # Panics
    /// When `key` is not a live resource.
    pub fn resource(&self, key: &ElementKey) -> &Resource {
        self.resources.element(key)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn add_resource(&mut self, kind: ResourceType) -> SyncResult<ElementKey> {
        self.resources
            .add(&mut self.doc, seed_record(&ResourceInput::of(kind)))
    }

    /// Replaces every resource with `resources`, in order, in one update.
    pub fn replace_resources(
        &mut self,
        resources: &[ResourceInput],
    ) -> SyncResult<Vec<ElementKey>> {
        let seeds = resources.iter().map(seed_record).collect();
        self.resources.replace_all(&mut self.doc, seeds)
    }

    /// Replaces the editable content with `input`: scalars and location go
    /// through one edit session, resources through one collection update.
    ///
    /// # Errors
    /// - `SyncError::PartialCommit` when some scalar fields failed to write;
    ///   resources are still replaced.
    /// - Storage errors from the resource update.
    pub fn apply_input(&mut self, input: &ActivityInput) -> SyncResult<()> {
        self.doc.start_edit();
        self.kind.set_edit(input.kind);
        self.title.set_edit(input.title.clone());
        self.intro.set_edit(input.intro.clone());
        self.location.edit_from(input.location.as_ref());
        let committed = self.doc.commit_edit();
        self.replace_resources(&input.resources)?;
        committed
    }

    pub fn delete_resource(&mut self, key: &ElementKey) -> SyncResult<UndoDelete> {
        self.resources.delete(&mut self.doc, key)
    }

    pub fn move_resource(&mut self, key: &ElementKey, delta: i64) -> SyncResult<bool> {
        self.resources.move_by(&self.doc, key, delta)
    }

    pub fn summary(&self) -> ActivitySummary {
        ActivitySummary {
            id: self.doc.id().to_string(),
            kind: self.kind.value(),
            title: self.display_title(),
        }
    }
}

impl SyncedEntity for Activity {
    const COLLECTION: &'static str = "activities";

    fn attach(store: Rc<dyn DocumentStore>, doc: DocRef) -> Self {
        let mut doc = Document::new(store, doc);
        Self {
            created: doc.new_prop(FieldPath::field("created"), None),
            unit: doc.new_prop(FieldPath::field("unit"), None),
            kind: doc.new_prop(FieldPath::field("type"), ActivityType::default()),
            title: doc.new_prop(FieldPath::field("title"), None),
            intro: doc.new_prop(FieldPath::field("intro"), None),
            location: Location::attach(&mut doc),
            resources: OrderedCollection::new("rsrcs", "rsrcOrder"),
            doc,
            live: None,
        }
    }

    fn read(&mut self, record: &Record) -> usize {
        let _guard = self.doc.suppress_echo();
        let order = self.resources.reconcile(&mut self.doc, record);
        let failed = self.doc.read_props(record);
        self.resources.set_order(order);
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
