use curriculum_core::store::{Subscription, SubscriptionId};
use curriculum_core::{
    CriterionType, DocRef, DocumentStore, ElementKey, FieldPath, FieldUpdate, FieldValue,
    MemoryStore, Record, StoreError, StoreResult, SyncError, SyncMode, SyncedEntity, Unit,
};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Memory store that records every update and can be told to fail writes.
#[derive(Default)]
struct RecordingStore {
    inner: MemoryStore,
    updates: RefCell<Vec<FieldUpdate>>,
    fail_writes: Cell<bool>,
}

impl RecordingStore {
    fn updates(&self) -> Vec<FieldUpdate> {
        self.updates.borrow().clone()
    }
}

impl DocumentStore for RecordingStore {
    fn get(&self, doc: &DocRef) -> StoreResult<Option<Record>> {
        self.inner.get(doc)
    }

    fn list(&self, collection: &str) -> StoreResult<Vec<(DocRef, Record)>> {
        self.inner.list(collection)
    }

    fn insert(&self, doc: &DocRef, record: Record) -> StoreResult<()> {
        self.inner.insert(doc, record)
    }

    fn update(&self, doc: &DocRef, update: &FieldUpdate) -> StoreResult<()> {
        if self.fail_writes.get() {
            return Err(StoreError::Unavailable("offline".to_string()));
        }
        self.updates.borrow_mut().push(update.clone());
        self.inner.update(doc, update)
    }

    fn subscribe(&self, doc: &DocRef) -> StoreResult<Subscription> {
        self.inner.subscribe(doc)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.unsubscribe(id)
    }
}

fn learn_x() -> Record {
    json!({
        "goal": "Learn X",
        "crits": {"1": {"type": "age", "min": 6, "max": 12}},
        "critOrder": ["1"],
    })
    .as_object()
    .cloned()
    .unwrap()
}

fn seeded() -> Rc<RecordingStore> {
    let store = Rc::new(RecordingStore::default());
    store.insert(&DocRef::new("units", "u1"), learn_x()).unwrap();
    store
}

fn stored(store: &RecordingStore) -> Record {
    store.get(&DocRef::new("units", "u1")).unwrap().unwrap()
}

#[test]
fn snapshot_reads_scalars_and_criteria() {
    let store = seeded();
    let unit = Unit::open(store.clone(), "u1", SyncMode::Snapshot).unwrap();

    assert_eq!(unit.goal().value(), Some("Learn X".to_string()));
    assert_eq!(unit.benefits().value(), None);
    assert_eq!(unit.criterion_count(), 1);
    let crit = unit.criteria()[0];
    assert_eq!(crit.kind().value(), CriterionType::Age);
    assert_eq!(crit.min().value(), Some(6));
    assert_eq!(crit.max().value(), Some(12));
    assert!(store.updates().is_empty());
}

#[test]
fn open_unknown_unit_is_not_found() {
    let store = seeded();
    let err = Unit::open(store, "missing", SyncMode::Snapshot).err().unwrap();
    assert!(matches!(err, SyncError::NotFound(doc) if doc.id() == "missing"));
}

#[test]
fn add_criterion_writes_element_and_order_in_one_update() {
    let store = seeded();
    let mut unit = Unit::open(store.clone(), "u1", SyncMode::Snapshot).unwrap();

    let key = unit.add_criterion(CriterionType::Interest).unwrap();

    assert_eq!(key, ElementKey::from("2"));
    assert_eq!(unit.criterion(&key).kind().value(), CriterionType::Interest);
    let updates = store.updates();
    assert_eq!(updates.len(), 1);
    let crits = FieldPath::field("crits");
    assert_eq!(
        updates[0].get(&crits.key(&key)),
        Some(&FieldValue::Set(json!({"type": "interest"})))
    );
    assert_eq!(
        updates[0].get(&FieldPath::field("critOrder")),
        Some(&FieldValue::Set(json!(["1", "2"])))
    );
    assert_eq!(stored(&store)["critOrder"], json!(["1", "2"]));
}

#[test]
fn edit_session_writes_only_changed_fields() {
    let store = seeded();
    let unit = Unit::open(store.clone(), "u1", SyncMode::Snapshot).unwrap();

    unit.start_edit();
    unit.commit_edit().unwrap();
    assert!(store.updates().is_empty());

    unit.start_edit();
    unit.benefits().set_edit(Some("Curiosity".to_string()));
    unit.criteria()[0].max().set_edit(Some(10));
    unit.commit_edit().unwrap();

    let updates = store.updates();
    assert_eq!(updates.len(), 2);
    let record = stored(&store);
    assert_eq!(record["benefits"], json!("Curiosity"));
    assert_eq!(record["crits"]["1"]["max"], json!(10));
    assert_eq!(record["goal"], json!("Learn X"));
}

#[test]
fn observed_goal_change_is_written_to_storage() {
    let store = seeded();
    let unit = Unit::open(store.clone(), "u1", SyncMode::Snapshot).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    unit.goal()
        .observe(move |goal: &Option<String>| sink.borrow_mut().push(goal.clone()));

    unit.goal().set(Some("Learn Y".to_string())).unwrap();

    assert_eq!(*seen.borrow(), vec![Some("Learn Y".to_string())]);
    assert_eq!(unit.goal().value(), Some("Learn Y".to_string()));
    assert_eq!(stored(&store)["goal"], json!("Learn Y"));
    assert_eq!(store.updates().len(), 1);
}

#[test]
fn cancelled_edit_leaves_values_untouched() {
    let store = seeded();
    let unit = Unit::open(store.clone(), "u1", SyncMode::Snapshot).unwrap();

    unit.start_edit();
    unit.goal().set_edit(Some("Something else".to_string()));

    assert_eq!(unit.goal().value(), Some("Learn X".to_string()));
    assert!(store.updates().is_empty());
}

#[test]
fn clearing_a_field_deletes_it_from_storage() {
    let store = seeded();
    let unit = Unit::open(store.clone(), "u1", SyncMode::Snapshot).unwrap();

    unit.criteria()[0].min().set(None).unwrap();

    assert_eq!(
        store.updates()[0].get(&FieldPath::field("crits").key(&ElementKey::from("1")).then("min")),
        Some(&FieldValue::Delete)
    );
    assert!(stored(&store)["crits"]["1"].get("min").is_none());
}

#[test]
fn live_unit_applies_pushes_without_echo() {
    let store = seeded();
    let mut live = Unit::open(store.clone(), "u1", SyncMode::Live).unwrap();
    let mut editor = Unit::open(store.clone(), "u1", SyncMode::Snapshot).unwrap();
    assert!(live.is_live());

    editor.goal().set(Some("Learn Y".to_string())).unwrap();
    editor.add_criterion(CriterionType::Custom).unwrap();
    assert_eq!(live.goal().value(), Some("Learn X".to_string()));

    let writes_before = store.updates().len();
    let applied = live.pump();

    assert_eq!(applied, 2);
    assert_eq!(live.goal().value(), Some("Learn Y".to_string()));
    assert_eq!(live.criterion_count(), 2);
    assert_eq!(store.updates().len(), writes_before);
}

#[test]
fn remote_delete_detaches_criterion_props() {
    let store = seeded();
    let mut live = Unit::open(store.clone(), "u1", SyncMode::Live).unwrap();
    let mut editor = Unit::open(store.clone(), "u1", SyncMode::Snapshot).unwrap();
    let min = live.criteria()[0].min().clone();

    let _undo = editor.delete_criterion(&ElementKey::from("1")).unwrap();
    live.pump();

    assert_eq!(live.criterion_count(), 0);
    assert!(!min.is_attached());
    let writes_before = store.updates().len();
    min.set(Some(1)).unwrap();
    assert_eq!(store.updates().len(), writes_before);
}

#[test]
fn close_and_drop_release_the_subscription() {
    let store = Rc::new(MemoryStore::new());
    store.insert(&DocRef::new("units", "u1"), learn_x()).unwrap();

    let mut closed = Unit::open(store.clone(), "u1", SyncMode::Live).unwrap();
    let dropped = Unit::open(store.clone(), "u1", SyncMode::Live).unwrap();
    assert_eq!(store.subscriber_count(), 2);

    assert!(closed.close());
    assert!(!closed.close());
    assert!(!closed.is_live());
    assert_eq!(store.subscriber_count(), 1);

    drop(dropped);
    assert_eq!(store.subscriber_count(), 0);
    assert_eq!(closed.pump(), 0);
}

#[test]
fn write_failures_are_surfaced() {
    let store = seeded();
    let mut unit = Unit::open(store.clone(), "u1", SyncMode::Snapshot).unwrap();
    store.fail_writes.set(true);

    let err = unit.goal().set(Some("Offline".to_string())).unwrap_err();
    assert!(matches!(err, SyncError::Store(StoreError::Unavailable(_))));

    let err = unit.add_criterion(CriterionType::Age).unwrap_err();
    assert!(matches!(err, SyncError::Store(_)));

    unit.start_edit();
    unit.benefits().set_edit(Some("b".to_string()));
    unit.justification().set_edit(Some("j".to_string()));
    match unit.commit_edit() {
        Err(SyncError::PartialCommit(failures)) => {
            let paths: Vec<&str> = failures.iter().map(|f| f.path.as_str()).collect();
            assert_eq!(paths, vec!["benefits", "justification"]);
        }
        other => panic!("expected partial commit, got {other:?}"),
    }
}

#[test]
fn malformed_field_is_skipped_and_rest_still_reads() {
    let store = Rc::new(MemoryStore::new());
    let record = json!({
        "goal": "Learn Z",
        "justification": 42,
        "crits": {"1": {"type": "age", "min": "six"}},
        "critOrder": ["1"],
    });
    let mut unit = Unit::attach(store, DocRef::new("units", "u9"));

    let failed = unit.read(record.as_object().unwrap());

    assert_eq!(failed, 2);
    assert_eq!(unit.goal().value(), Some("Learn Z".to_string()));
    assert_eq!(unit.justification().value(), None);
    assert_eq!(unit.criteria()[0].kind().value(), CriterionType::Age);
    assert_eq!(unit.criteria()[0].min().value(), None);
}

#[test]
fn summary_uses_goal_or_empty() {
    let store = Rc::new(MemoryStore::new());
    let unit = Unit::from_record(store, DocRef::new("units", "u2"), &Record::new());
    let summary = unit.summary();
    assert_eq!(summary.id, "u2");
    assert_eq!(summary.goal, "");
}
