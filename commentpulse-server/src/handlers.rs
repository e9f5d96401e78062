//! HTTP endpoint handlers
//!
//! Request/response shapes mirror what the browser-extension producers
//! already speak: an `{"success": ...}` envelope, camelCase payloads, and a
//! summary endpoint addressable either by explicit period+date or by a
//! lookback window in days.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use commentpulse_core::analytics::{self, CacheOutcome};
use commentpulse_core::{
    recorder, Error, Event, Period, PlatformFilter, RecordOutcome, Summary, ValidationErrorKind,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Response for accepted event submissions (including duplicate no-ops).
#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub success: bool,
    pub duplicate: bool,
}

/// Response envelope for event list queries.
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub success: bool,
    pub events: Vec<Event>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub events: i64,
}

/// POST /api/analytics/event
///
/// Accepts the bare Event JSON; the legacy `{"event": {...}}` wrapper some
/// producers still send is unwrapped transparently. A duplicate `eventId` is
/// a success, not an error.
pub async fn record_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<AcceptResponse>, ApiError> {
    let payload = unwrap_envelope(body);

    let db = state.db();
    let outcome = state
        .with_store(move || recorder::record_event(&db, payload))
        .await?;

    Ok(Json(AcceptResponse {
        success: true,
        duplicate: outcome == RecordOutcome::Duplicate,
    }))
}

/// Query parameters for GET /api/analytics/summary.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub platform: Option<String>,
    pub period: Option<String>,
    pub date: Option<String>,
    pub days: Option<i64>,
}

/// GET /api/analytics/summary
///
/// Served from the summary cache; a miss runs the aggregator and broadcasts
/// the fresh summary to WebSocket subscribers. A window with zero events
/// returns an all-zero summary, never an error.
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Summary>, ApiError> {
    let platform = parse_platform(query.platform.as_deref())?;
    let period = query
        .period
        .as_deref()
        .map(parse_period)
        .transpose()?;
    let date = query.date.as_deref().map(parse_date).transpose()?;

    let today = Utc::now().date_naive();
    let (period, date) = resolve_window(period, date, query.days, today);

    let db = state.db();
    let (summary, outcome) = state
        .with_store(move || analytics::get_or_compute(&db, platform, period, date))
        .await?;

    if outcome == CacheOutcome::Computed {
        state.publish(summary.clone());
    }

    Ok(Json(summary))
}

/// GET /api/analytics/post/{post_id}
pub async fn post_events(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<Json<EventsResponse>, ApiError> {
    let db = state.db();
    let events = state
        .with_store(move || db.events_for_post(&post_id))
        .await?;

    Ok(Json(EventsResponse {
        success: true,
        events,
    }))
}

/// Query parameters for GET /api/analytics/platform/{platform}.
#[derive(Debug, Default, Deserialize)]
pub struct PlatformEventsQuery {
    pub days: Option<i64>,
}

/// GET /api/analytics/platform/{platform}
///
/// Events for one platform (or "all") over a lookback window, newest window
/// end at now.
pub async fn platform_events(
    State(state): State<Arc<AppState>>,
    Path(platform): Path<String>,
    Query(query): Query<PlatformEventsQuery>,
) -> Result<Json<EventsResponse>, ApiError> {
    let filter = parse_platform(Some(&platform))?;
    let days = query.days.unwrap_or(30).max(1);

    let end = Utc::now();
    let start = end - Duration::days(days);

    let db = state.db();
    let events = state
        .with_store(move || db.events_in_window(filter, start, end))
        .await?;

    Ok(Json(EventsResponse {
        success: true,
        events,
    }))
}

/// GET /health
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let db = state.db();
    let events = state.with_store(move || db.count_events()).await?;

    Ok(Json(HealthResponse {
        status: "ok",
        events,
    }))
}

/// Unwrap the legacy `{"event": {...}}` envelope if present.
fn unwrap_envelope(body: serde_json::Value) -> serde_json::Value {
    match body {
        serde_json::Value::Object(ref map) if map.len() == 1 && map.contains_key("event") => {
            map["event"].clone()
        }
        other => other,
    }
}

fn parse_platform(value: Option<&str>) -> Result<PlatformFilter, Error> {
    match value {
        None => Ok(PlatformFilter::All),
        Some(s) => s
            .parse()
            .map_err(|e: String| Error::validation(ValidationErrorKind::InvalidEnum, e)),
    }
}

fn parse_period(value: &str) -> Result<Period, Error> {
    value
        .parse()
        .map_err(|e: String| Error::validation(ValidationErrorKind::InvalidEnum, e))
}

fn parse_date(value: &str) -> Result<NaiveDate, Error> {
    value.parse().map_err(|_| {
        Error::validation(
            ValidationErrorKind::ShapeMismatch,
            format!("date must be YYYY-MM-DD, got {:?}", value),
        )
    })
}

/// Resolve the summary window from query parameters.
///
/// Explicit `period` (+ optional `date`) wins; a bare `date` means a daily
/// window; otherwise the lookback in `days` (default 30) picks the smallest
/// period covering it, anchored at today.
fn resolve_window(
    period: Option<Period>,
    date: Option<NaiveDate>,
    days: Option<i64>,
    today: NaiveDate,
) -> (Period, NaiveDate) {
    match (period, date) {
        (Some(p), d) => (p, d.unwrap_or(today)),
        (None, Some(d)) => (Period::Daily, d),
        (None, None) => {
            let days = days.unwrap_or(30).max(1);
            let period = if days <= 1 {
                Period::Daily
            } else if days <= 7 {
                Period::Weekly
            } else {
                Period::Monthly
            };
            (period, today)
        }
    }
}
