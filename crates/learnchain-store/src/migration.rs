//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "journal schema migrated");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Journal: one row per committed operation
        CREATE TABLE events (
            seq INTEGER PRIMARY KEY,          -- 1-based, gapless
            event_id BLOB NOT NULL UNIQUE,    -- 32 bytes, Blake3 of canonical bytes
            prev_event_id BLOB,               -- 32 bytes, NULL for seq=1
            timestamp INTEGER NOT NULL,       -- commit time (Unix seconds)
            kind TEXT NOT NULL,               -- event type name
            canonical_bytes BLOB NOT NULL,    -- canonical CBOR encoding
            appended_at INTEGER NOT NULL      -- local time of append (Unix ms)
        );

        -- Addresses each event concerns
        CREATE TABLE event_participants (
            address BLOB NOT NULL,            -- 20 bytes
            seq INTEGER NOT NULL REFERENCES events(seq),
            PRIMARY KEY (address, seq)
        );

        CREATE INDEX idx_events_kind ON events(kind);
        CREATE INDEX idx_events_timestamp ON events(timestamp);
        "#,
    )?;

    Ok(())
}

/// Current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"events".to_string()));
        assert!(tables.contains(&"event_participants".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, 0)",
            [CURRENT_VERSION + 1],
        )
        .unwrap();
        assert!(matches!(migrate(&mut conn), Err(StoreError::Migration(_))));
    }
}
