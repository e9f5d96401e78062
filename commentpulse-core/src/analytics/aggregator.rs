//! On-demand summary computation
//!
//! `compute_summary` scans the event store for one calendar window and folds
//! the events into a [`Summary`]. The computation has no side effects, so a
//! cancelled or failed scan leaves nothing behind; a failure never yields a
//! partially-filled summary.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::{Event, EventType, Period, PlatformFilter, Summary};

/// Compute the summary for one (platform, period, date) window.
///
/// The window is `[startOfPeriod(date), endOfPeriod(date))` in UTC (see
/// [`Period::window`]); window membership is decided by the event's
/// authoritative `metadata.timestamp`, never by arrival order. A window with
/// zero events yields a well-formed all-zero summary, with 0.0 averages
/// rather than NaN.
pub fn compute_summary(
    db: &Database,
    platform: PlatformFilter,
    period: Period,
    date: NaiveDate,
) -> Result<Summary> {
    let window_start = period.truncate(date);
    let (start, end) = period.window(date);

    tracing::debug!(
        platform = %platform,
        period = %period,
        window_start = %window_start,
        "Computing summary"
    );

    let events = db
        .events_in_window(platform, start, end)
        .map_err(|e| match e {
            Error::Database(err) => Error::Aggregation(format!("event scan failed: {}", err)),
            other => other,
        })?;

    Ok(fold_events(platform, period, window_start, &events))
}

/// Fold a window's events into a summary. Pure; deterministic for a given
/// input slice.
fn fold_events(
    platform: PlatformFilter,
    period: Period,
    window_start: NaiveDate,
    events: &[Event],
) -> Summary {
    let mut summary = Summary::empty(platform, period, window_start);

    let mut generation_time_sum = 0.0;
    let mut selection_time_sum = 0.0;
    let mut posts: HashSet<&str> = HashSet::new();

    for event in events {
        posts.insert(event.post_id.as_str());

        match event.event_type {
            EventType::Generation => {
                summary.total_generations += 1;
                // A missing timing contributes 0 to the mean; the divisor is
                // the event count, not the sample count
                generation_time_sum += event.performance.generation_time_ms.unwrap_or(0.0);
                for comment in &event.generated_comments {
                    *summary
                        .tone_distribution
                        .entry(comment.tone.clone())
                        .or_insert(0) += 1;
                }
            }
            EventType::Selection => {
                summary.total_selections += 1;
                selection_time_sum += event.performance.selection_time_ms.unwrap_or(0.0);
            }
        }
    }

    summary.unique_post_count = posts.len() as u64;
    summary.average_generation_time_ms = mean(generation_time_sum, summary.total_generations);
    summary.average_selection_time_ms = mean(selection_time_sum, summary.total_selections);
    summary
}

/// Division-by-zero-safe mean: an empty population yields 0.0, never NaN.
fn mean(sum: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
