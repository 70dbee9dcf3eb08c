//! Integration tests for the data model and its wire formats.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mastery_session::error::Error;
use mastery_session::model::*;
use serde_json::json;

fn at(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap()
}

fn payload(rating: u8) -> ReviewPayload {
    ReviewPayload {
        text: "two pointers from both ends".to_string(),
        error_log: String::new(),
        user_difficulty_rating: rating,
        submitted_at: at("2026-03-01T09:30:00.250Z"),
    }
}

// ---------------------------------------------------------------------------
// Review payload
// ---------------------------------------------------------------------------

#[test]
fn payload_serializes_with_camel_case_keys() {
    let value: serde_json::Value = serde_json::from_str(&payload(7).to_json().unwrap()).unwrap();
    assert_eq!(
        value,
        json!({
            "text": "two pointers from both ends",
            "errorLog": "",
            "userDifficultyRating": 7,
            "submittedAt": "2026-03-01T09:30:00.250Z",
        })
    );
}

#[test]
fn payload_round_trips_timestamp_at_millisecond_precision() {
    let raw = payload(3).to_json().unwrap();
    let back: ReviewPayload = serde_json::from_str(&raw).unwrap();
    assert_eq!(back, payload(3));
}

#[test]
fn submission_rejects_out_of_range_rating() {
    let result = ReviewSubmission::new(ItemId::new("a"), Grade::Good, 1200, payload(11));
    assert!(matches!(result, Err(Error::InvalidPayload(_))));
}

#[test]
fn idempotency_key_depends_on_item_and_timestamp() {
    let submission = ReviewSubmission::new(ItemId::new("a"), Grade::Good, 1200, payload(5)).unwrap();
    assert_eq!(submission.idempotency_key(), "a:2026-03-01T09:30:00.250Z");

    let mut later = submission.clone();
    later.payload.submitted_at = at("2026-03-01T09:30:01.000Z");
    assert_ne!(later.idempotency_key(), submission.idempotency_key());
    assert!(later.same_inputs(&submission));

    later.grade = Grade::Hard;
    assert!(!later.same_inputs(&submission));
}

// ---------------------------------------------------------------------------
// Grade
// ---------------------------------------------------------------------------

#[test]
fn grade_parses_and_serializes_as_number() {
    assert_eq!("3".parse::<Grade>().unwrap(), Grade::Good);
    assert_eq!(" 1 ".parse::<Grade>().unwrap(), Grade::Again);
    assert!(matches!("5".parse::<Grade>(), Err(Error::InvalidGrade(5))));
    assert!("good".parse::<Grade>().is_err());

    assert_eq!(serde_json::to_string(&Grade::Easy).unwrap(), "4");
    assert_eq!(serde_json::from_str::<Grade>("2").unwrap(), Grade::Hard);
    assert!(serde_json::from_str::<Grade>("0").is_err());
}

#[test]
fn only_again_and_hard_are_failures() {
    let failures: Vec<Grade> = Grade::ALL.into_iter().filter(|g| g.is_failure()).collect();
    assert_eq!(failures, vec![Grade::Again, Grade::Hard]);
    assert!(Grade::Again < Grade::Easy);
}

// ---------------------------------------------------------------------------
// Review item
// ---------------------------------------------------------------------------

#[test]
fn scheduler_state_accepts_codes_and_names() {
    let item: ReviewItem = serde_json::from_value(json!({
        "id": "8d2f5a1c-0b3e",
        "title": "Two Sum",
        "type": "problem",
        "card_state": 1,
        "current_step": 0,
    }))
    .unwrap();
    assert_eq!(item.scheduler_state, SchedulerState::Learning);
    assert_eq!(item.learning_step(), Some(0));
    assert_eq!(item.id.short(), "8d2f5a1c");
    assert_eq!(item.node_type, "problem");

    let item: ReviewItem = serde_json::from_value(json!({
        "id": "b",
        "title": "Rolle's theorem",
        "card_state": "Relearning",
    }))
    .unwrap();
    assert_eq!(item.scheduler_state, SchedulerState::Relearning);
    assert_eq!(item.learning_step(), None);
    assert_eq!(item.body, "");

    let bad = serde_json::from_value::<ReviewItem>(json!({
        "id": "c",
        "title": "x",
        "card_state": 7,
    }));
    assert!(bad.is_err());
}

#[test]
fn interval_map_from_wire_keys() {
    let wire: BTreeMap<String, String> = [("1", "1m"), ("3", "10m")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let map = interval_map_from_wire(wire).unwrap();
    assert_eq!(map.get(&Grade::Again).map(String::as_str), Some("1m"));
    assert_eq!(map.get(&Grade::Good).map(String::as_str), Some("10m"));
    assert!(!map.contains_key(&Grade::Easy));

    let wire = BTreeMap::from([("9".to_string(), "1y".to_string())]);
    assert!(interval_map_from_wire(wire).is_err());
}

#[test]
fn destination_defaults_to_root() {
    assert_eq!(Destination::default().as_str(), "/");
    assert_eq!(Notice::error("x").level, NoticeLevel::Error);
}
