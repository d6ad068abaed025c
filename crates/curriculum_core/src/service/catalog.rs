//! Unit and activity catalog use-cases.
//!
//! # Responsibility
//! - List, search and create units and activities over an injected store.
//! - Open entities in snapshot or live mode.
//!
//! # Invariants
//! - The service holds no document state of its own; storage is the only source.
//! - Listing reads raw records and never attaches properties.

use crate::entity::{
    Activity, ActivityInput, ActivitySummary, ActivityType, CriterionInput, SyncMode,
    SyncedEntity, Unit, UnitSummary,
};
use crate::model::record::Record;
use crate::service::fixtures::fixture_documents;
use crate::store::{new_doc_ref, DocRef, DocumentStore, StoreError};
use crate::sync::{SyncError, SyncResult};
use log::info;
use serde_json::{json, Value};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Case-aware substring filter for catalog search.
///
/// An empty seek matches everything. A seek containing uppercase characters
/// matches case-sensitively; otherwise matching ignores case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFilter {
    seek: String,
    case_sensitive: bool,
}

impl TextFilter {
    pub fn new(seek: &str) -> Self {
        Self {
            case_sensitive: seek.to_lowercase() != seek,
            seek: seek.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.seek.is_empty()
    }

    pub fn matches(&self, text: Option<&str>) -> bool {
        if self.seek.is_empty() {
            return true;
        }
        match text {
            None => false,
            Some(text) if self.case_sensitive => text.contains(&self.seek),
            Some(text) => text.to_lowercase().contains(&self.seek),
        }
    }
}

/// Editable description fields of a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Details {
    pub goal: String,
    pub benefits: Option<String>,
    pub justification: Option<String>,
}

/// Catalog use-case service.
pub struct CatalogService {
    store: Rc<dyn DocumentStore>,
}

impl CatalogService {
    pub fn new(store: Rc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Rc<dyn DocumentStore> {
        &self.store
    }

    /// Every unit, oldest first.
    pub fn list_units(&self) -> SyncResult<Vec<UnitSummary>> {
        let units = self.sorted(Unit::COLLECTION)?;
        Ok(units
            .iter()
            .map(|(doc, record)| UnitSummary {
                id: doc.id().to_string(),
                goal: text_field(record, "goal").unwrap_or_default().to_string(),
            })
            .collect())
    }

    /// Units whose goal, benefits, justification or criterion text match `seek`.
    pub fn search_units(&self, seek: &str) -> SyncResult<Vec<UnitSummary>> {
        let filter = TextFilter::new(seek);
        let units = self.sorted(Unit::COLLECTION)?;
        Ok(units
            .iter()
            .filter(|(_, record)| unit_matches(&filter, record))
            .map(|(doc, record)| UnitSummary {
                id: doc.id().to_string(),
                goal: text_field(record, "goal").unwrap_or_default().to_string(),
            })
            .collect())
    }

    /// Creates an empty unit with `goal` and returns it as a snapshot.
    pub fn create_unit(&self, goal: &str) -> SyncResult<Unit> {
        let doc = new_doc_ref(Unit::COLLECTION);
        let record = object(json!({
            "created": now_epoch_ms(),
            "goal": goal,
        }));
        self.store.insert(&doc, record.clone())?;
        info!("event=unit_create module=service status=ok doc={doc}");
        Ok(Unit::from_record(Rc::clone(&self.store), doc, &record))
    }

    pub fn open_unit(&self, id: &str, mode: SyncMode) -> SyncResult<Unit> {
        Unit::open(Rc::clone(&self.store), id, mode)
    }

    /// Replaces a unit's details through one edit session.
    ///
    /// # Errors
    /// - `SyncError::NotFound` for an unknown unit.
    /// - `SyncError::PartialCommit` when some fields failed to write.
    pub fn update_details(&self, unit_id: &str, details: &Details) -> SyncResult<()> {
        let unit = self.open_unit(unit_id, SyncMode::Snapshot)?;
        unit.start_edit();
        unit.goal().set_edit(Some(details.goal.clone()));
        unit.benefits().set_edit(details.benefits.clone());
        unit.justification().set_edit(details.justification.clone());
        unit.commit_edit()
    }

    /// Replaces a unit's criteria with `criteria`, in order.
    ///
    /// # Errors
    /// - `SyncError::NotFound` for an unknown unit.
    pub fn update_criteria(&self, unit_id: &str, criteria: &[CriterionInput]) -> SyncResult<()> {
        let mut unit = self.open_unit(unit_id, SyncMode::Snapshot)?;
        let keys = unit.replace_criteria(criteria)?;
        info!(
            "event=criteria_update module=service status=ok unit={unit_id} count={}",
            keys.len()
        );
        Ok(())
    }

    /// Creates an activity of `kind` belonging to `unit_id`.
    pub fn create_activity(&self, unit_id: &str, kind: ActivityType) -> SyncResult<Activity> {
        let unit = DocRef::new(Unit::COLLECTION, unit_id);
        if self.store.get(&unit)?.is_none() {
            return Err(SyncError::NotFound(unit));
        }
        let doc = new_doc_ref(Activity::COLLECTION);
        let record = object(json!({
            "created": now_epoch_ms(),
            "unit": unit_id,
            "type": kind,
        }));
        self.store.insert(&doc, record.clone())?;
        info!("event=activity_create module=service status=ok doc={doc} unit={unit_id}");
        Ok(Activity::from_record(Rc::clone(&self.store), doc, &record))
    }

    /// Replaces an activity's type, title, intro, location and resources.
    ///
    /// # Errors
    /// - `SyncError::NotFound` for an unknown activity.
    /// - `SyncError::PartialCommit` when some scalar fields failed to write.
    pub fn update_activity(&self, activity_id: &str, input: &ActivityInput) -> SyncResult<()> {
        let mut activity = self.open_activity(activity_id, SyncMode::Snapshot)?;
        activity.apply_input(input)?;
        info!(
            "event=activity_update module=service status=ok activity={activity_id} resources={}",
            input.resources.len()
        );
        Ok(())
    }

    /// Activities of `unit_id`, oldest first.
    pub fn list_activities(&self, unit_id: &str) -> SyncResult<Vec<ActivitySummary>> {
        let activities = self.sorted(Activity::COLLECTION)?;
        Ok(activities
            .into_iter()
            .filter(|(_, record)| text_field(record, "unit") == Some(unit_id))
            .map(|(doc, record)| {
                Activity::from_record(Rc::clone(&self.store), doc, &record).summary()
            })
            .collect())
    }

    pub fn open_activity(&self, id: &str, mode: SyncMode) -> SyncResult<Activity> {
        Activity::open(Rc::clone(&self.store), id, mode)
    }

    /// Inserts every sample document not yet present. Returns how many were inserted.
    pub fn seed_fixtures(&self) -> SyncResult<usize> {
        let mut inserted = 0;
        for (doc, record) in fixture_documents() {
            match self.store.insert(&doc, record) {
                Ok(()) => inserted += 1,
                Err(StoreError::AlreadyExists(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
        info!("event=seed_fixtures module=service status=ok inserted={inserted}");
        Ok(inserted)
    }

    fn sorted(&self, collection: &str) -> SyncResult<Vec<(DocRef, Record)>> {
        let mut docs = self.store.list(collection)?;
        docs.sort_by(|(a_doc, a), (b_doc, b)| {
            created(a)
                .cmp(&created(b))
                .then_with(|| a_doc.id().cmp(b_doc.id()))
        });
        Ok(docs)
    }
}

fn unit_matches(filter: &TextFilter, record: &Record) -> bool {
    if filter.is_empty() {
        return true;
    }
    let scalars = ["goal", "benefits", "justification"]
        .iter()
        .any(|name| filter.matches(text_field(record, name)));
    scalars
        || record
            .get("crits")
            .and_then(Value::as_object)
            .is_some_and(|crits| {
                crits
                    .values()
                    .any(|crit| filter.matches(crit.get("text").and_then(Value::as_str)))
            })
}

fn text_field<'a>(record: &'a Record, name: &str) -> Option<&'a str> {
    record.get(name).and_then(Value::as_str)
}

fn created(record: &Record) -> i64 {
    record.get("created").and_then(Value::as_i64).unwrap_or(0)
}

fn object(value: Value) -> Record {
    match value {
        Value::Object(record) => record,
        _ => Record::new(),
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
