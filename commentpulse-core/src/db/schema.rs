//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: event log + summary cache
    r#"
    -- ============================================
    -- Canonical event log (append-only, lossless)
    -- ============================================

    -- event_id is the producer-generated identity and the dedup key.
    -- Duplicate submissions hit the primary key and become no-ops.
    CREATE TABLE IF NOT EXISTS events (
        event_id           TEXT PRIMARY KEY,
        post_id            TEXT NOT NULL,
        event_type         TEXT NOT NULL,      -- 'generation', 'selection'
        platform           TEXT NOT NULL,      -- 'linkedin', 'breakcold'
        ts                 DATETIME NOT NULL,  -- authoritative event time (UTC)

        -- Parsed payload fields
        source_post        JSON NOT NULL,
        generated_comments JSON,
        selected_comment   JSON,
        generation_time_ms REAL,
        selection_time_ms  REAL,
        total_time_ms      REAL,
        completion_type    TEXT,               -- 'selection', 'no_selection'
        context            JSON,

        -- Lossless capture of the accepted payload
        raw_data           JSON NOT NULL,

        recorded_at        DATETIME NOT NULL
    );

    -- ============================================
    -- Derived summary cache (regenerable)
    -- ============================================

    CREATE TABLE IF NOT EXISTS summaries (
        platform     TEXT NOT NULL,            -- 'linkedin', 'breakcold', 'all'
        period       TEXT NOT NULL,            -- 'daily', 'weekly', 'monthly'
        window_start DATE NOT NULL,            -- truncated to the period
        computed_at  DATETIME NOT NULL,
        payload      JSON NOT NULL,

        PRIMARY KEY (platform, period, window_start)
    );

    -- ============================================
    -- Indexes
    -- ============================================

    CREATE INDEX IF NOT EXISTS idx_events_post ON events(post_id);
    CREATE INDEX IF NOT EXISTS idx_events_platform_ts ON events(platform, ts);
    CREATE INDEX IF NOT EXISTS idx_events_type_ts ON events(event_type, ts);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Run migrations twice - should be idempotent
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        // Check version
        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["events", "summaries"] {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_indexes_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for index in [
            "idx_events_post",
            "idx_events_platform_ts",
            "idx_events_type_ts",
        ] {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name=?",
                    [index],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Index {} should exist", index);
        }
    }

    #[test]
    fn test_event_id_is_primary_key() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let pk_column: String = conn
            .query_row(
                "SELECT name FROM pragma_table_info('events') WHERE pk = 1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(pk_column, "event_id");
    }
}
