//! Integration tests for the ingest -> aggregate -> cache pipeline
//!
//! These tests drive the library the way the HTTP layer does: raw JSON
//! payloads into the recorder, summaries out of the cache.

use chrono::NaiveDate;
use commentpulse_core::analytics::{self, CacheOutcome};
use commentpulse_core::db::Database;
use commentpulse_core::{record_event, Period, Platform, PlatformFilter, RecordOutcome};
use serde_json::json;

fn open_db() -> Database {
    let db = Database::open_in_memory().expect("open in-memory db");
    db.migrate().expect("migrate schema");
    db
}

fn generation_payload(event_id: &str, post_id: &str, ts: &str) -> serde_json::Value {
    json!({
        "eventId": event_id,
        "postId": post_id,
        "type": "generation",
        "platform": "linkedin",
        "sourcePost": {
            "text": "Excited to share our Q1 results",
            "length": 31,
            "sentiment": "positive",
            "keywords": ["results", "q1"]
        },
        "generatedComments": [
            {
                "id": "c0",
                "text": "Congratulations on the strong quarter!",
                "tone": "friendly",
                "metrics": {"length": 38, "sentiment": "positive", "keywords": ["quarter"]}
            },
            {
                "id": "c1",
                "text": "Impressive numbers across the board.",
                "tone": "neutral",
                "metrics": {"length": 36, "sentiment": "neutral", "keywords": []}
            }
        ],
        "performance": {"generationTimeMs": 742.0, "totalTimeMs": 742.0},
        "metadata": {
            "timestamp": ts,
            "context": {"userAgent": "Mozilla/5.0", "browserInfo": "chrome"}
        }
    })
}

fn selection_payload(event_id: &str, post_id: &str, ts: &str) -> serde_json::Value {
    json!({
        "eventId": event_id,
        "postId": post_id,
        "type": "selection",
        "platform": "linkedin",
        "sourcePost": {
            "text": "Excited to share our Q1 results",
            "length": 31
        },
        "selectedComment": {
            "id": "c0",
            "text": "Congratulations on the strong quarter!",
            "index": 0,
            "isRegenerated": false
        },
        "performance": {"selectionTimeMs": 301.0, "totalTimeMs": 1043.0},
        "metadata": {"timestamp": ts, "completionType": "selection"}
    })
}

#[test]
fn end_to_end_generation_selection_daily_summary() {
    let db = open_db();

    // One generation with two comments (friendly, neutral), one selection of
    // index 0, both for post p1 on 2024-01-01
    let outcome = record_event(
        &db,
        generation_payload("evt-g1", "p1", "2024-01-01T10:00:00Z"),
    )
    .expect("record generation");
    assert_eq!(outcome, RecordOutcome::Recorded);

    let outcome = record_event(
        &db,
        selection_payload("evt-s1", "p1", "2024-01-01T10:05:00Z"),
    )
    .expect("record selection");
    assert_eq!(outcome, RecordOutcome::Recorded);

    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let (summary, outcome) = analytics::get_or_compute(
        &db,
        PlatformFilter::Only(Platform::Linkedin),
        Period::Daily,
        date,
    )
    .expect("compute daily summary");

    assert_eq!(outcome, CacheOutcome::Computed);
    assert_eq!(summary.total_generations, 1);
    assert_eq!(summary.total_selections, 1);
    assert_eq!(summary.unique_post_count, 1);
    assert_eq!(summary.average_generation_time_ms, 742.0);
    assert_eq!(summary.average_selection_time_ms, 301.0);
    assert_eq!(summary.tone_distribution.get("friendly"), Some(&1));
    assert_eq!(summary.tone_distribution.get("neutral"), Some(&1));
    assert_eq!(summary.tone_distribution.len(), 2);
}

#[test]
fn resubmitted_events_do_not_inflate_summaries() {
    let db = open_db();

    // The producer retries the same generation three times
    for _ in 0..3 {
        record_event(
            &db,
            generation_payload("evt-g1", "p1", "2024-01-01T10:00:00Z"),
        )
        .expect("record generation");
    }

    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let (summary, _) =
        analytics::get_or_compute(&db, PlatformFilter::All, Period::Daily, date)
            .expect("compute summary");

    assert_eq!(summary.total_generations, 1);
    assert_eq!(summary.unique_post_count, 1);
}

#[test]
fn events_outside_window_are_invisible() {
    let db = open_db();

    record_event(
        &db,
        generation_payload("evt-g1", "p1", "2024-01-01T10:00:00Z"),
    )
    .expect("record generation");
    record_event(
        &db,
        generation_payload("evt-g2", "p2", "2024-01-02T00:00:00Z"),
    )
    .expect("record generation");

    // Jan 1 daily window excludes the event stamped exactly at Jan 2 midnight
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let (summary, _) =
        analytics::get_or_compute(&db, PlatformFilter::All, Period::Daily, date)
            .expect("compute summary");
    assert_eq!(summary.total_generations, 1);

    // The Jan 2 window picks it up instead
    let next = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let (summary, _) =
        analytics::get_or_compute(&db, PlatformFilter::All, Period::Daily, next)
            .expect("compute summary");
    assert_eq!(summary.total_generations, 1);
    assert_eq!(summary.unique_post_count, 1);
}

#[test]
fn zero_event_window_returns_well_formed_summary() {
    let db = open_db();

    let date = NaiveDate::from_ymd_opt(2030, 5, 20).unwrap();
    let (summary, outcome) = analytics::get_or_compute(
        &db,
        PlatformFilter::Only(Platform::Breakcold),
        Period::Weekly,
        date,
    )
    .expect("compute summary");

    assert_eq!(outcome, CacheOutcome::Computed);
    assert_eq!(summary.total_generations, 0);
    assert_eq!(summary.total_selections, 0);
    assert_eq!(summary.average_generation_time_ms, 0.0);
    assert_eq!(summary.average_selection_time_ms, 0.0);
    assert_eq!(summary.unique_post_count, 0);
    assert!(summary.tone_distribution.is_empty());

    // Even the empty summary is cached under its key
    let (_, second) = analytics::get_or_compute(
        &db,
        PlatformFilter::Only(Platform::Breakcold),
        Period::Weekly,
        date,
    )
    .expect("compute summary");
    assert_eq!(second, CacheOutcome::Hit);
}

#[test]
fn rejected_payloads_leave_no_rows() {
    let db = open_db();

    let mut payload = generation_payload("evt-bad", "p1", "2024-01-01T10:00:00Z");
    payload["generatedComments"] = json!([]);
    assert!(record_event(&db, payload).is_err());

    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let (summary, _) =
        analytics::get_or_compute(&db, PlatformFilter::All, Period::Daily, date)
            .expect("compute summary");
    assert_eq!(summary.total_generations, 0);
    assert!(db.get_event("evt-bad").expect("query").is_none());
}

#[test]
fn post_history_spans_event_types() {
    let db = open_db();

    record_event(
        &db,
        generation_payload("evt-g1", "p1", "2024-01-01T10:00:00Z"),
    )
    .expect("record generation");
    record_event(
        &db,
        selection_payload("evt-s1", "p1", "2024-01-01T10:05:00Z"),
    )
    .expect("record selection");

    let events = db.events_for_post("p1").expect("query post events");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_id, "evt-g1");
    assert_eq!(events[1].event_id, "evt-s1");
    assert!(events[1].selected_comment.is_some());
    assert_eq!(
        events[1].selected_comment.as_ref().unwrap().index,
        0
    );
}
