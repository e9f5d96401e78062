//! Event recorder: validate, normalize, persist
//!
//! The recorder is the only write path into the event store. A payload is
//! decoded and validated in full before any write happens; a payload that
//! fails validation leaves no trace in the store. Duplicate submissions of
//! the same `eventId` are absorbed silently: producers retrying under
//! at-least-once delivery must be able to resend without seeing errors.

use crate::db::{Database, InsertOutcome};
use crate::error::{Error, Result, ValidationErrorKind};
use crate::types::{Event, EventType, Performance, MAX_KEYWORDS};

/// Outcome of recording an event. Both variants are success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new row was written
    Recorded,
    /// The `eventId` was already stored; nothing changed
    Duplicate,
}

/// Record one event payload into the store.
///
/// Exactly one durable write happens per distinct `eventId`, no matter how
/// often or how concurrently the same payload is submitted.
pub fn record_event(db: &Database, payload: serde_json::Value) -> Result<RecordOutcome> {
    let event = decode_event(&payload)?;
    validate_event(&event)?;
    let event = normalize_event(event);

    match db.insert_event(&event, &payload)? {
        InsertOutcome::Inserted => {
            tracing::info!(
                event_id = %event.event_id,
                post_id = %event.post_id,
                event_type = %event.event_type,
                platform = %event.platform,
                "Recorded event"
            );
            Ok(RecordOutcome::Recorded)
        }
        InsertOutcome::Duplicate => {
            tracing::debug!(event_id = %event.event_id, "Duplicate event absorbed");
            Ok(RecordOutcome::Duplicate)
        }
    }
}

/// Decode the wire payload, classifying serde failures into the validation
/// taxonomy: absent fields, out-of-domain enum values, wrong shapes.
fn decode_event(payload: &serde_json::Value) -> Result<Event> {
    serde_json::from_value(payload.clone()).map_err(|e| {
        let message = e.to_string();
        let kind = if message.starts_with("missing field") {
            ValidationErrorKind::MissingField
        } else if message.contains("unknown variant") {
            ValidationErrorKind::InvalidEnum
        } else {
            ValidationErrorKind::ShapeMismatch
        };
        Error::validation(kind, message)
    })
}

/// Cross-field invariants that serde cannot express.
fn validate_event(event: &Event) -> Result<()> {
    if event.event_id.trim().is_empty() {
        return Err(Error::validation(
            ValidationErrorKind::MissingField,
            "eventId must not be empty",
        ));
    }
    if event.post_id.trim().is_empty() {
        return Err(Error::validation(
            ValidationErrorKind::MissingField,
            "postId must not be empty",
        ));
    }

    // Per-type required fields, dispatched on the type discriminant
    match event.event_type {
        EventType::Generation => {
            if event.generated_comments.is_empty() {
                return Err(Error::validation(
                    ValidationErrorKind::MissingField,
                    "generation event requires at least one generated comment",
                ));
            }
        }
        EventType::Selection => {
            if event.selected_comment.is_none() {
                return Err(Error::validation(
                    ValidationErrorKind::MissingField,
                    "selection event requires a selected comment",
                ));
            }
        }
    }

    validate_performance(&event.performance)?;
    Ok(())
}

fn validate_performance(performance: &Performance) -> Result<()> {
    for (name, value) in [
        ("generationTimeMs", performance.generation_time_ms),
        ("selectionTimeMs", performance.selection_time_ms),
        ("totalTimeMs", performance.total_time_ms),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::validation(
                    ValidationErrorKind::ShapeMismatch,
                    format!("performance.{} must be a non-negative number", name),
                ));
            }
        }
    }
    Ok(())
}

/// Normalize bounded fields before storage.
fn normalize_event(mut event: Event) -> Event {
    event.source_post.keywords.truncate(MAX_KEYWORDS);
    for comment in &mut event.generated_comments {
        comment.metrics.keywords.truncate(MAX_KEYWORDS);
    }
    event
}
