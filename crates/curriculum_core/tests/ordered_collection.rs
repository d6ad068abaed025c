use curriculum_core::{
    DocRef, Document, DocumentStore, ElementKey, FieldPath, ListElement, MemoryStore,
    OrderedCollection, PropRef, Record, SyncError,
};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    static DELETED: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

struct Tag {
    key: ElementKey,
    prefix: FieldPath,
    label: PropRef<Option<String>>,
}

impl ListElement for Tag {
    fn attach(doc: &mut Document, base: &FieldPath, key: ElementKey) -> Self {
        let prefix = base.key(&key);
        Self {
            label: doc.new_prop(prefix.then("label"), None),
            key,
            prefix,
        }
    }

    fn key(&self) -> &ElementKey {
        &self.key
    }

    fn deleted(&self, doc: &mut Document) {
        DELETED.with(|deleted| deleted.borrow_mut().push(self.key.to_string()));
        doc.remove_props_under(&self.prefix);
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        if let Some(label) = self.label.value() {
            record.insert("label".to_string(), Value::String(label));
        }
        record
    }
}

struct Fixture {
    store: Rc<MemoryStore>,
    doc: Document,
    tags: OrderedCollection<Tag>,
}

impl Fixture {
    fn new(value: Value) -> Self {
        let store = Rc::new(MemoryStore::new());
        let doc_ref = DocRef::new("boards", "b1");
        store.insert(&doc_ref, record(value.clone())).unwrap();
        let mut fixture = Self {
            doc: Document::new(store.clone(), doc_ref),
            store,
            tags: OrderedCollection::new("tags", "tagOrder"),
        };
        fixture.read(value);
        fixture
    }

    fn read(&mut self, value: Value) -> Vec<ElementKey> {
        let record = record(value);
        let _guard = self.doc.suppress_echo();
        let order = self.tags.reconcile(&mut self.doc, &record);
        self.doc.read_props(&record);
        self.tags.set_order(order.clone());
        order
    }

    fn reload(&mut self) {
        let stored = self.stored();
        self.read(Value::Object(stored));
    }

    fn stored(&self) -> Record {
        self.store.get(self.doc.doc_ref()).unwrap().unwrap()
    }

    fn labels(&self) -> Vec<String> {
        self.tags
            .elements()
            .iter()
            .map(|tag| tag.label.value().unwrap_or_default())
            .collect()
    }
}

fn record(value: Value) -> Record {
    value.as_object().cloned().expect("fixture must be an object")
}

fn keys(raw: &[&str]) -> Vec<ElementKey> {
    raw.iter().map(|key| ElementKey::from(*key)).collect()
}

fn three_tags() -> Value {
    json!({
        "tags": {"1": {"label": "one"}, "2": {"label": "two"}, "3": {"label": "three"}},
        "tagOrder": ["1", "2", "3"],
    })
}

#[test]
fn reconcile_is_idempotent() {
    let raw = json!({
        "tags": {"a": {"label": "A"}, "b": {"label": "B"}},
        "tagOrder": ["b", "a"],
    });
    let mut fixture = Fixture::new(raw.clone());
    let first = fixture.tags.keys();
    let props_after_first = fixture.doc.prop_count();

    let second = fixture.read(raw);

    assert_eq!(first, second);
    assert_eq!(second, keys(&["b", "a"]));
    assert_eq!(fixture.doc.prop_count(), props_after_first);
}

#[test]
fn reconcile_appends_elements_missing_from_order() {
    let fixture = Fixture::new(json!({
        "tags": {"a": {}, "b": {}, "c": {}},
        "tagOrder": ["c", "a"],
    }));
    assert_eq!(fixture.tags.keys(), keys(&["c", "a", "b"]));
}

#[test]
fn reconcile_drops_stale_and_duplicate_order_entries() {
    let fixture = Fixture::new(json!({
        "tags": {"a": {}, "b": {}},
        "tagOrder": ["x", "b", "b", 7, "a"],
    }));
    assert_eq!(fixture.tags.keys(), keys(&["b", "a"]));
}

#[test]
fn reconcile_without_elements_field_has_no_elements() {
    let fixture = Fixture::new(json!({"tagOrder": ["1", "2"]}));
    assert!(fixture.tags.is_empty());
    assert_eq!(fixture.doc.prop_count(), 0);
}

#[test]
fn reconcile_removes_deleted_elements_exactly_once() {
    let mut fixture = Fixture::new(json!({
        "tags": {"a": {"label": "A"}, "b": {"label": "B"}},
        "tagOrder": ["a", "b"],
    }));
    let removed = fixture.tags.get(&ElementKey::from("a")).unwrap().label.clone();

    let only_b = json!({"tags": {"b": {"label": "B"}}, "tagOrder": ["a", "b"]});
    fixture.read(only_b.clone());
    fixture.read(only_b);

    assert_eq!(fixture.tags.keys(), keys(&["b"]));
    assert!(fixture.tags.get(&ElementKey::from("a")).is_none());
    assert!(!removed.is_attached());
    DELETED.with(|deleted| assert_eq!(*deleted.borrow(), vec!["a".to_string()]));
}

#[test]
fn elements_follow_order_and_read_nested_props() {
    let fixture = Fixture::new(json!({
        "tags": {"1": {"label": "one"}, "2": {"label": "two"}},
        "tagOrder": ["2", "1"],
    }));
    assert_eq!(fixture.labels(), vec!["two", "one"]);
}

#[test]
#[should_panic(expected = "has no element")]
fn element_lookup_of_unknown_key_fails_fast() {
    let fixture = Fixture::new(three_tags());
    fixture.tags.element(&ElementKey::from("9"));
}

#[test]
fn add_is_local_first_and_writes_element_with_order() {
    let mut fixture = Fixture::new(three_tags());
    let mut seed = Record::new();
    seed.insert("label".to_string(), json!("four"));

    let key = fixture.tags.add(&mut fixture.doc, seed).unwrap();

    assert_eq!(key, ElementKey::from("4"));
    assert_eq!(fixture.labels(), vec!["one", "two", "three", "four"]);
    let stored = fixture.stored();
    assert_eq!(stored["tags"]["4"], json!({"label": "four"}));
    assert_eq!(stored["tagOrder"], json!(["1", "2", "3", "4"]));
}

#[test]
fn keys_are_not_reused_after_delete() {
    let mut fixture = Fixture::new(three_tags());
    let undo = fixture.tags.delete(&mut fixture.doc, &ElementKey::from("3")).unwrap();
    drop(undo);
    fixture.reload();

    assert_eq!(fixture.tags.next_key().unwrap(), ElementKey::from("4"));
}

#[test]
fn add_after_largest_numeric_key_is_rejected() {
    let mut fixture = Fixture::new(json!({
        "tags": {"18446744073709551615": {"label": "last"}},
        "tagOrder": ["18446744073709551615"],
    }));
    let before = fixture.stored();

    let err = fixture.tags.add(&mut fixture.doc, Record::new()).unwrap_err();

    assert!(matches!(err, SyncError::KeysExhausted { ref collection } if collection == "tags"));
    assert_eq!(fixture.tags.len(), 1);
    assert_eq!(fixture.stored(), before);
}

#[test]
fn delete_then_undo_restores_fields_and_position() {
    let mut fixture = Fixture::new(three_tags());

    let undo = fixture.tags.delete(&mut fixture.doc, &ElementKey::from("2")).unwrap();
    assert_eq!(fixture.labels(), vec!["one", "three"]);
    let stored = fixture.stored();
    assert!(stored["tags"].get("2").is_none());
    assert_eq!(stored["tagOrder"], json!(["1", "3"]));

    undo.apply().unwrap();
    fixture.reload();

    assert_eq!(fixture.tags.keys(), keys(&["1", "2", "3"]));
    assert_eq!(fixture.labels(), vec!["one", "two", "three"]);
}

#[test]
fn replace_all_swaps_every_element_in_one_update() {
    let mut fixture = Fixture::new(three_tags());
    let old_label = fixture.tags.element(&ElementKey::from("1")).label.clone();
    let seeds = ["alpha", "beta"]
        .iter()
        .map(|label| record(json!({ "label": label })))
        .collect();

    let new_keys = fixture.tags.replace_all(&mut fixture.doc, seeds).unwrap();

    assert_eq!(new_keys, keys(&["4", "5"]));
    assert_eq!(fixture.labels(), vec!["alpha", "beta"]);
    assert!(!old_label.is_attached());
    assert_eq!(fixture.doc.prop_count(), 2);
    let stored = fixture.stored();
    assert_eq!(stored["tags"], json!({"4": {"label": "alpha"}, "5": {"label": "beta"}}));
    assert_eq!(stored["tagOrder"], json!(["4", "5"]));
}

#[test]
fn deleting_last_element_removes_order_field() {
    let mut fixture = Fixture::new(json!({"tags": {"1": {"label": "x"}}, "tagOrder": ["1"]}));
    let _undo = fixture.tags.delete(&mut fixture.doc, &ElementKey::from("1")).unwrap();
    assert!(fixture.stored().get("tagOrder").is_none());
}

#[test]
fn move_clamps_at_both_ends() {
    let mut fixture = Fixture::new(three_tags());
    let before = fixture.stored();

    let first = ElementKey::from("1");
    let last = ElementKey::from("3");
    assert!(!fixture.tags.move_by(&fixture.doc, &first, -5).unwrap());
    assert!(!fixture.tags.move_by(&fixture.doc, &last, 5).unwrap());

    assert_eq!(fixture.tags.keys(), keys(&["1", "2", "3"]));
    assert_eq!(fixture.stored(), before);
}

#[test]
fn move_persists_whole_order() {
    let mut fixture = Fixture::new(three_tags());

    assert!(fixture
        .tags
        .move_by(&fixture.doc, &ElementKey::from("1"), 1)
        .unwrap());
    assert!(fixture
        .tags
        .move_by(&fixture.doc, &ElementKey::from("3"), -10)
        .unwrap());

    assert_eq!(fixture.tags.keys(), keys(&["3", "2", "1"]));
    assert_eq!(fixture.stored()["tagOrder"], json!(["3", "2", "1"]));
}

#[test]
fn unknown_keys_are_reported() {
    let mut fixture = Fixture::new(three_tags());
    let missing = ElementKey::from("9");

    let err = fixture.tags.move_by(&fixture.doc, &missing, 1).unwrap_err();
    assert!(matches!(err, SyncError::UnknownElement { .. }));

    let err = fixture.tags.delete(&mut fixture.doc, &missing).err().unwrap();
    assert!(matches!(err, SyncError::UnknownElement { ref key, .. } if key == &missing));
}

#[test]
fn order_observers_see_reconciled_order() {
    let mut fixture = Fixture::new(three_tags());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    fixture
        .tags
        .order()
        .observe(move |order: &Vec<ElementKey>| sink.borrow_mut().push(order.len()));

    fixture.read(json!({"tags": {"1": {}, "3": {}}, "tagOrder": ["3", "1"]}));

    assert_eq!(*seen.borrow(), vec![2]);
}
