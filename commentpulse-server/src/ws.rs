//! WebSocket summary broadcast
//!
//! Subscribers connect to `/ws`, optionally scoped to one platform, and
//! receive newly computed summaries as they happen. Delivery is best-effort
//! and at-most-once per subscriber: a lagging receiver drops the oldest
//! updates, a disconnected one simply stops receiving. Nothing is
//! acknowledged or replayed.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use commentpulse_core::{Error, PlatformFilter, Summary, ValidationErrorKind};

use crate::error::ApiError;
use crate::state::AppState;

/// Messages pushed to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsPayload {
    /// The most recently cached summary, sent once on connect
    Initial(Summary),
    /// A summary that was just computed
    Update(Summary),
}

/// Query parameters for GET /ws.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Restrict updates to one platform scope ("linkedin", "breakcold",
    /// "all"); absent means every update
    pub platform: Option<String>,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query
        .platform
        .as_deref()
        .map(|s| {
            s.parse::<PlatformFilter>()
                .map_err(|e| Error::validation(ValidationErrorKind::InvalidEnum, e))
        })
        .transpose()?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, filter)))
}

/// Drive one subscriber connection until it closes or errors.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, filter: Option<PlatformFilter>) {
    let connection_id = Uuid::new_v4().to_string();
    tracing::info!(
        connection_id = %connection_id,
        filter = filter.map(|f| f.to_string()).unwrap_or_else(|| "none".to_string()),
        "Summary subscriber connected"
    );

    let mut updates = state.subscribe();
    let (mut sender, mut receiver) = socket.split();

    // Initial push: the most recently cached summary, if any
    let db = state.db();
    match state.with_store(move || db.latest_summary(filter)).await {
        Ok(Some(summary)) => {
            if send_payload(&mut sender, &WsPayload::Initial(summary))
                .await
                .is_err()
            {
                tracing::debug!(connection_id = %connection_id, "Subscriber gone before initial push");
                return;
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(connection_id = %connection_id, error = %e, "Skipping initial push");
        }
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(summary) => {
                    if !matches_filter(&summary, filter) {
                        continue;
                    }
                    if send_payload(&mut sender, &WsPayload::Update(summary)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Best-effort delivery: a slow subscriber loses the
                    // oldest updates rather than stalling the channel
                    tracing::warn!(
                        connection_id = %connection_id,
                        skipped,
                        "Subscriber lagging, updates dropped"
                    );
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                    break;
                }
                // Subscribers have nothing to say; ignore pings and stray text
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!(connection_id = %connection_id, "Summary subscriber disconnected");
}

async fn send_payload(
    sender: &mut (impl SinkExt<Message> + Unpin),
    payload: &WsPayload,
) -> Result<(), ()> {
    let json = serde_json::to_string(payload).map_err(|_| ())?;
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Whether an update should be delivered to a subscriber with this filter.
fn matches_filter(summary: &Summary, filter: Option<PlatformFilter>) -> bool {
    match filter {
        None => true,
        Some(f) => summary.platform == f,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use commentpulse_core::{Period, Platform};

    fn summary_for(platform: PlatformFilter) -> Summary {
        Summary::empty(
            platform,
            Period::Daily,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_no_filter_receives_everything() {
        assert!(matches_filter(&summary_for(PlatformFilter::All), None));
        assert!(matches_filter(
            &summary_for(PlatformFilter::Only(Platform::Linkedin)),
            None
        ));
    }

    #[test]
    fn test_platform_filter_is_exact() {
        let filter = Some(PlatformFilter::Only(Platform::Linkedin));
        assert!(matches_filter(
            &summary_for(PlatformFilter::Only(Platform::Linkedin)),
            filter
        ));
        assert!(!matches_filter(
            &summary_for(PlatformFilter::Only(Platform::Breakcold)),
            filter
        ));
        // "all"-scoped summaries are their own scope, not a superset
        assert!(!matches_filter(&summary_for(PlatformFilter::All), filter));
    }

    #[test]
    fn test_payload_wire_shape() {
        let payload = WsPayload::Update(summary_for(PlatformFilter::All));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "update");
        assert_eq!(json["data"]["platform"], "all");
        assert_eq!(json["data"]["totalGenerations"], 0);
    }
}
