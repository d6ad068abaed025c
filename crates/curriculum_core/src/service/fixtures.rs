//! Sample curriculum used to populate an empty store.

use crate::entity::{Activity, SyncedEntity, Unit};
use crate::model::record::Record;
use crate::store::DocRef;
use serde_json::{json, Map, Value};

/// Builds `(elements, order)` for a collection whose keys are `1..=n`.
fn keyed(elements: Vec<Value>) -> (Value, Value) {
    let mut map = Map::new();
    let mut order = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        let key = (index + 1).to_string();
        order.push(Value::String(key.clone()));
        map.insert(key, element);
    }
    (Value::Object(map), Value::Array(order))
}

fn into_record(value: Value) -> Record {
    match value {
        Value::Object(record) => record,
        _ => Record::new(),
    }
}

fn unit(id: &str, created: i64, goal: &str, benefits: &str, criteria: Vec<Value>) -> (DocRef, Record) {
    let (crits, crit_order) = keyed(criteria);
    let record = json!({
        "created": created,
        "goal": goal,
        "benefits": benefits,
        "crits": crits,
        "critOrder": crit_order,
    });
    (DocRef::new(Unit::COLLECTION, id), into_record(record))
}

fn activity(
    unit_id: &str,
    n: u32,
    created: i64,
    kind: &str,
    title: Option<&str>,
    intro: &str,
    resources: &[(&str, &str)],
) -> (DocRef, Record) {
    let (rsrcs, rsrc_order) = keyed(
        resources
            .iter()
            .map(|(kind, url)| json!({"type": kind, "url": url}))
            .collect(),
    );
    let mut record = into_record(json!({
        "created": created + i64::from(n),
        "unit": unit_id,
        "type": kind,
        "intro": intro,
        "rsrcs": rsrcs,
        "rsrcOrder": rsrc_order,
    }));
    if let Some(title) = title {
        record.insert("title".to_string(), Value::String(title.to_string()));
    }
    (
        DocRef::new(Activity::COLLECTION, format!("{unit_id}-{n}")),
        record,
    )
}

fn interest(text: &str) -> Value {
    json!({"type": "interest", "text": text})
}

fn age(min: i64, max: i64) -> Value {
    json!({"type": "age", "min": min, "max": max})
}

/// Every fixture document, units first.
pub(crate) fn fixture_documents() -> Vec<(DocRef, Record)> {
    const TITANIC: i64 = 1_546_300_800_000;
    const MAGNUS: i64 = 1_546_387_200_000;

    vec![
        unit(
            "1",
            TITANIC,
            "Learn about the Titanic",
            "Which is great, because engineering failures teach us a lot about building things.",
            vec![
                age(6, 12),
                interest("engineering"),
                interest("robotics"),
                interest("cartography"),
            ],
        ),
        unit(
            "2",
            MAGNUS,
            "learn about tower sails, planes without wings & the magnus effect",
            "Which is great, because both tower sails and wingless aircraft use interesting \
             physics and container ships with tower sails reduce reliance on diesel.",
            vec![
                age(12, 99),
                interest("engineering"),
                interest("sailing"),
                interest("flight"),
                interest("aeronautics"),
                interest("physics"),
                interest("math"),
                interest("magnus effect"),
            ],
        ),
        activity(
            "1",
            1,
            TITANIC,
            "read",
            None,
            "Read this stuff!",
            &[
                ("book", "https://www.amazon.com/Tonight-Titanic-Magic-Tree-House/dp/0679890637"),
                ("book", "https://www.amazon.com/You-Wouldnt-Want-Sail-Titanic/dp/0531245055"),
            ],
        ),
        activity(
            "1",
            2,
            TITANIC,
            "watch",
            None,
            "This documentary tells the story of Robert Ballard as he searches for and \
             discovers the Titanic. Also you get to meet Alvin.",
            &[
                ("video", "https://www.youtube.com/watch?v=NrahF3opykM"),
                ("video", "https://www.youtube.com/watch?v=rg9NnS3c1CQ"),
            ],
        ),
        activity(
            "1",
            3,
            TITANIC,
            "draw",
            None,
            "Try drawing the ship quickly three times, then develop one of your drawings into \
             a more detailed drawing.",
            &[],
        ),
        activity(
            "1",
            4,
            TITANIC,
            "custom",
            Some("Plot"),
            "41.726931° N and -49.948253° W\n\nThis is where the Titanic is. Plot this on a map.",
            &[],
        ),
        activity(
            "2",
            1,
            MAGNUS,
            "watch",
            None,
            "First, let's pique our interests. Why on earth does the following happen?",
            &[("video", "https://www.youtube.com/watch?v=QtP_bh2lMXc")],
        ),
        activity(
            "2",
            2,
            MAGNUS,
            "read",
            None,
            "Read the wikipedia page on the magnus effect & flettner rotor.",
            &[
                ("page", "https://en.wikipedia.org/wiki/Magnus_effect"),
                ("page", "https://en.wikipedia.org/wiki/Flettner_rotor"),
            ],
        ),
        activity(
            "2",
            3,
            MAGNUS,
            "custom",
            Some("Explore"),
            "In the videos above, you heard mention of Newton's third law. Explore its \
             implications here:",
            &[(
                "page",
                "https://www.physicsclassroom.com/class/newtlaws/Lesson-4/Newton-s-Third-Law",
            )],
        ),
    ]
}
