//! Shared application state
//!
//! The state is built once in `main` and handed to every request; nothing in
//! the server lives in module-level statics. The database handle is the only
//! shared mutable resource, and every access to it goes through
//! [`AppState::with_store`] so a slow store cannot hang a request past its
//! timeout.

use std::sync::Arc;
use std::time::Duration;

use commentpulse_core::{Database, Error, Summary};
use tokio::sync::broadcast;

/// Shared state for all request handlers and WebSocket connections.
pub struct AppState {
    db: Arc<Database>,
    updates: broadcast::Sender<Summary>,
    store_timeout: Duration,
}

impl AppState {
    /// Create state around an opened, migrated database.
    pub fn new(db: Database, store_timeout: Duration, broadcast_capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            db: Arc::new(db),
            updates,
            store_timeout,
        }
    }

    /// Handle to the event store.
    pub fn db(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Subscribe to newly computed summaries.
    pub fn subscribe(&self) -> broadcast::Receiver<Summary> {
        self.updates.subscribe()
    }

    /// Broadcast a freshly computed summary to subscribers, best-effort.
    ///
    /// A send error only means there are currently no subscribers.
    pub fn publish(&self, summary: Summary) {
        if let Ok(delivered) = self.updates.send(summary) {
            tracing::debug!(subscribers = delivered, "Broadcast summary update");
        }
    }

    /// Number of currently subscribed summary receivers.
    pub fn subscriber_count(&self) -> usize {
        self.updates.receiver_count()
    }

    /// Run a blocking store operation off the async runtime, bounded by the
    /// configured store timeout.
    ///
    /// The store's rusqlite calls are synchronous, so they run on the
    /// blocking pool; a timeout surfaces as `StoreUnavailable`, which the
    /// caller may retry. Dropping the returned future (client disconnect)
    /// abandons the result; recording is idempotent and aggregation is pure,
    /// so abandoned work has no observable side effects beyond an absorbed
    /// row.
    pub async fn with_store<T, F>(&self, op: F) -> Result<T, Error>
    where
        F: FnOnce() -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let timeout = self.store_timeout;
        match tokio::time::timeout(timeout, tokio::task::spawn_blocking(op)).await {
            Err(_) => Err(Error::StoreUnavailable(format!(
                "store operation timed out after {}ms",
                timeout.as_millis()
            ))),
            Ok(Err(join_err)) => Err(Error::StoreUnavailable(format!(
                "store task failed: {}",
                join_err
            ))),
            Ok(Ok(result)) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commentpulse_core::{Period, PlatformFilter};

    fn test_state() -> Arc<AppState> {
        let db = Database::open_in_memory().expect("open db");
        db.migrate().expect("migrate");
        Arc::new(AppState::new(db, Duration::from_secs(5), 16))
    }

    #[tokio::test]
    async fn test_with_store_runs_operation() {
        let state = test_state();
        let db = state.db();
        let count = state.with_store(move || db.count_events()).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_with_store_times_out() {
        let db = Database::open_in_memory().expect("open db");
        db.migrate().expect("migrate");
        let state = AppState::new(db, Duration::from_millis(10), 16);

        let result: Result<(), Error> = state
            .with_store(|| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;

        match result {
            Err(Error::StoreUnavailable(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected StoreUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let state = test_state();
        let summary = Summary::empty(
            PlatformFilter::All,
            Period::Daily,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        // Must not panic or error
        state.publish(summary);
        assert_eq!(state.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_published_summaries() {
        let state = test_state();
        let mut rx = state.subscribe();

        let summary = Summary::empty(
            PlatformFilter::All,
            Period::Daily,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        state.publish(summary.clone());

        let received = rx.recv().await.expect("receive update");
        assert_eq!(received, summary);
    }
}
