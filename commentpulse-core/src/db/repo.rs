//! Database repository layer
//!
//! Provides the append-only event log and the summary cache table. Events are
//! never updated or deleted here; retention is an external concern.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;

/// Outcome of an event insert attempt.
///
/// `Duplicate` means the uniqueness constraint on `event_id` absorbed the
/// write: the row already existed and nothing changed. Both outcomes are
/// success for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::StoreUnavailable(format!("failed to open {:?}: {}", path, e)))?;

        // WAL mode for better concurrency between the ingest and query paths
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    // ============================================
    // Event operations (append-only)
    // ============================================

    /// Insert a validated event along with its raw payload.
    ///
    /// The primary key on `event_id` resolves concurrent same-id writers:
    /// `ON CONFLICT DO NOTHING` means the loser of the race observes
    /// [`InsertOutcome::Duplicate`], never an error, and exactly one row
    /// exists afterward.
    pub fn insert_event(&self, event: &Event, raw: &serde_json::Value) -> Result<InsertOutcome> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            r#"
            INSERT INTO events (event_id, post_id, event_type, platform, ts,
                                source_post, generated_comments, selected_comment,
                                generation_time_ms, selection_time_ms, total_time_ms,
                                completion_type, context, raw_data, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(event_id) DO NOTHING
            "#,
            params![
                event.event_id,
                event.post_id,
                event.event_type.as_str(),
                event.platform.as_str(),
                event.metadata.timestamp.to_rfc3339(),
                serde_json::to_string(&event.source_post)?,
                serde_json::to_string(&event.generated_comments)?,
                event
                    .selected_comment
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                event.performance.generation_time_ms,
                event.performance.selection_time_ms,
                event.performance.total_time_ms,
                event.metadata.completion_type.map(|c| c.as_str()),
                if event.metadata.context.is_null() {
                    None
                } else {
                    Some(event.metadata.context.to_string())
                },
                raw.to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        if changed == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    /// Get a single event by its id
    pub fn get_event(&self, event_id: &str) -> Result<Option<Event>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("{} WHERE event_id = ?", SELECT_EVENT),
            [event_id],
            Self::row_to_event,
        )
        .optional()
        .map_err(Error::from)
    }

    /// All recorded events for a post, oldest first
    pub fn events_for_post(&self, post_id: &str) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("{} WHERE post_id = ? ORDER BY ts", SELECT_EVENT))?;
        let rows = stmt.query_map([post_id], Self::row_to_event)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    /// Events whose authoritative timestamp falls in the half-open interval
    /// `[start, end)`, optionally restricted to one platform.
    ///
    /// Timestamps are stored as UTC RFC 3339 text, so lexicographic `ts`
    /// comparison matches chronological order.
    pub fn events_in_window(
        &self,
        filter: PlatformFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        let rows = match filter {
            PlatformFilter::All => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE ts >= ?1 AND ts < ?2 ORDER BY ts",
                    SELECT_EVENT
                ))?;
                let mapped = stmt.query_map(
                    params![start.to_rfc3339(), end.to_rfc3339()],
                    Self::row_to_event,
                )?;
                mapped.collect::<rusqlite::Result<Vec<_>>>()?
            }
            PlatformFilter::Only(platform) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE platform = ?1 AND ts >= ?2 AND ts < ?3 ORDER BY ts",
                    SELECT_EVENT
                ))?;
                let mapped = stmt.query_map(
                    params![platform.as_str(), start.to_rfc3339(), end.to_rfc3339()],
                    Self::row_to_event,
                )?;
                mapped.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }

    /// Events of one type in the half-open interval `[start, end)`.
    pub fn events_by_type(
        &self,
        event_type: EventType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE event_type = ?1 AND ts >= ?2 AND ts < ?3 ORDER BY ts",
            SELECT_EVENT
        ))?;
        let mapped = stmt.query_map(
            params![event_type.as_str(), start.to_rfc3339(), end.to_rfc3339()],
            Self::row_to_event,
        )?;
        mapped
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::from)
    }

    /// Total number of recorded events (used by the health endpoint)
    pub fn count_events(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;
        Ok(count)
    }

    fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
        let ts_str: String = row.get("ts")?;
        let source_post_str: String = row.get("source_post")?;
        let generated_str: Option<String> = row.get("generated_comments")?;
        let selected_str: Option<String> = row.get("selected_comment")?;
        let event_type_str: String = row.get("event_type")?;
        let platform_str: String = row.get("platform")?;
        let completion_str: Option<String> = row.get("completion_type")?;
        let context_str: Option<String> = row.get("context")?;

        let timestamp = DateTime::parse_from_rfc3339(&ts_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| json_column_error("ts", e))?;
        let source_post: SourcePost =
            serde_json::from_str(&source_post_str).map_err(|e| json_column_error("source_post", e))?;
        let generated_comments: Vec<GeneratedComment> = match generated_str {
            Some(s) => serde_json::from_str(&s)
                .map_err(|e| json_column_error("generated_comments", e))?,
            None => Vec::new(),
        };
        let selected_comment: Option<SelectedComment> = selected_str
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| json_column_error("selected_comment", e))?;

        Ok(Event {
            event_id: row.get("event_id")?,
            post_id: row.get("post_id")?,
            event_type: event_type_str
                .parse()
                .map_err(|e: String| text_column_error("event_type", e))?,
            platform: platform_str
                .parse()
                .map_err(|e: String| text_column_error("platform", e))?,
            source_post,
            generated_comments,
            selected_comment,
            performance: Performance {
                generation_time_ms: row.get("generation_time_ms")?,
                selection_time_ms: row.get("selection_time_ms")?,
                total_time_ms: row.get("total_time_ms")?,
            },
            metadata: EventMetadata {
                timestamp,
                completion_type: completion_str
                    .map(|s| s.parse())
                    .transpose()
                    .map_err(|e: String| text_column_error("completion_type", e))?,
                context: context_str
                    .and_then(|s| serde_json::from_str(&s).ok())
                    .unwrap_or(serde_json::Value::Null),
            },
        })
    }

    // ============================================
    // Summary cache operations
    // ============================================

    /// Fetch a cached summary by its (platform, period, window_start) key
    pub fn get_summary(
        &self,
        platform: PlatformFilter,
        period: Period,
        window_start: NaiveDate,
    ) -> Result<Option<Summary>> {
        let conn = self.conn.lock().unwrap();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM summaries
                 WHERE platform = ?1 AND period = ?2 AND window_start = ?3",
                params![
                    platform.as_str(),
                    period.as_str(),
                    window_start.to_string()
                ],
                |r| r.get(0),
            )
            .optional()?;

        payload
            .map(|s| serde_json::from_str(&s).map_err(Error::from))
            .transpose()
    }

    /// Store a computed summary under its key.
    ///
    /// Concurrent computations of the same key are functionally identical,
    /// so last-writer-wins is safe here.
    pub fn put_summary(&self, summary: &Summary) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO summaries (platform, period, window_start, computed_at, payload)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(platform, period, window_start) DO UPDATE SET
                computed_at = excluded.computed_at,
                payload = excluded.payload
            "#,
            params![
                summary.platform.as_str(),
                summary.period.as_str(),
                summary.window_start.to_string(),
                Utc::now().to_rfc3339(),
                serde_json::to_string(summary)?,
            ],
        )?;
        Ok(())
    }

    /// The most recently computed summary, optionally restricted to one
    /// platform scope. Used for the initial push to new subscribers.
    pub fn latest_summary(&self, filter: Option<PlatformFilter>) -> Result<Option<Summary>> {
        let conn = self.conn.lock().unwrap();
        let payload: Option<String> = match filter {
            Some(f) => conn
                .query_row(
                    "SELECT payload FROM summaries WHERE platform = ?1
                     ORDER BY computed_at DESC LIMIT 1",
                    [f.as_str()],
                    |r| r.get(0),
                )
                .optional()?,
            None => conn
                .query_row(
                    "SELECT payload FROM summaries ORDER BY computed_at DESC LIMIT 1",
                    [],
                    |r| r.get(0),
                )
                .optional()?,
        };

        payload
            .map(|s| serde_json::from_str(&s).map_err(Error::from))
            .transpose()
    }
}

/// Shared column list so every event query reconstructs the same shape.
const SELECT_EVENT: &str = "SELECT event_id, post_id, event_type, platform, ts,
    source_post, generated_comments, selected_comment,
    generation_time_ms, selection_time_ms, total_time_ms,
    completion_type, context FROM events";

fn json_column_error(
    column: &'static str,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    tracing::warn!(column, "Failed to decode stored column");
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

fn text_column_error(column: &'static str, message: String) -> rusqlite::Error {
    tracing::warn!(column, %message, "Unknown enum value in stored column");
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        message.into(),
    )
}
