//! SQLite implementation of the JournalStore trait.
//!
//! This is the durable journal backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking. Records are stored
//! as their canonical bytes and decoded on read.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use learnchain_core::canonical::{decode_record, id_of_bytes};
use learnchain_core::{Address, EventId, EventRecord};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{AppendResult, JournalHead, JournalStore};

/// SQLite-based journal.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteJournal {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteJournal {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` on the connection in a blocking task.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn decode_all(rows: Vec<Vec<u8>>) -> Result<Vec<EventRecord>> {
    rows.iter()
        .map(|bytes| decode_record(bytes).map_err(StoreError::from))
        .collect()
}

fn parse_event_id(bytes: &[u8]) -> Result<EventId> {
    EventId::try_from(bytes).map_err(|_| StoreError::InvalidData("event_id is not 32 bytes".into()))
}

#[async_trait]
impl JournalStore for SqliteJournal {
    async fn append(&self, record: &EventRecord, canonical: &[u8]) -> Result<AppendResult> {
        let record = record.clone();
        let canonical = canonical.to_vec();

        self.blocking(move |conn| {
            let id = id_of_bytes(&canonical);
            let seq = record.seq as i64;

            let existing: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT event_id FROM events WHERE seq = ?1",
                    params![seq],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_bytes) = existing {
                let existing = parse_event_id(&existing_bytes)?;
                if existing == id {
                    return Ok(AppendResult::AlreadyExists);
                }
                return Ok(AppendResult::Conflict { existing });
            }

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO events (
                    seq, event_id, prev_event_id, timestamp, kind, canonical_bytes, appended_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    seq,
                    id.0.as_slice(),
                    record.prev.as_ref().map(|p| p.0.as_slice()),
                    record.timestamp,
                    record.event.kind(),
                    canonical.as_slice(),
                    now_millis(),
                ],
            )?;
            for address in record.event.participants() {
                tx.execute(
                    "INSERT INTO event_participants (address, seq) VALUES (?1, ?2)",
                    params![address.as_bytes().as_slice(), seq],
                )?;
            }
            tx.commit()?;

            Ok(AppendResult::Appended)
        })
        .await
    }

    async fn get(&self, seq: u64) -> Result<Option<EventRecord>> {
        let bytes = self.canonical_bytes(seq).await?;
        bytes
            .map(|b| decode_record(&b).map_err(StoreError::from))
            .transpose()
    }

    async fn get_by_id(&self, id: &EventId) -> Result<Option<EventRecord>> {
        let id = *id;
        let bytes: Option<Vec<u8>> = self
            .blocking(move |conn| {
                conn.query_row(
                    "SELECT canonical_bytes FROM events WHERE event_id = ?1",
                    params![id.0.as_slice()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?;
        bytes
            .map(|b| decode_record(&b).map_err(StoreError::from))
            .transpose()
    }

    async fn canonical_bytes(&self, seq: u64) -> Result<Option<Bytes>> {
        let Ok(seq) = i64::try_from(seq) else {
            return Ok(None);
        };
        let bytes: Option<Vec<u8>> = self
            .blocking(move |conn| {
                conn.query_row(
                    "SELECT canonical_bytes FROM events WHERE seq = ?1",
                    params![seq],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?;
        Ok(bytes.map(Bytes::from))
    }

    async fn range(&self, start: u64, end: u64) -> Result<Vec<EventRecord>> {
        let start = i64::try_from(start).unwrap_or(i64::MAX);
        let end = i64::try_from(end).unwrap_or(i64::MAX);

        let rows = self
            .blocking(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT canonical_bytes FROM events
                     WHERE seq >= ?1 AND seq <= ?2
                     ORDER BY seq",
                )?;
                let rows = stmt
                    .query_map(params![start, end], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
                Ok(rows)
            })
            .await?;
        decode_all(rows)
    }

    async fn head(&self) -> Result<Option<JournalHead>> {
        let row: Option<(i64, Vec<u8>)> = self
            .blocking(|conn| {
                conn.query_row(
                    "SELECT seq, event_id FROM events ORDER BY seq DESC LIMIT 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?;

        match row {
            Some((seq, id)) => Ok(Some(JournalHead {
                seq: u64::try_from(seq)
                    .map_err(|_| StoreError::InvalidData(format!("negative seq {}", seq)))?,
                id: parse_event_id(&id)?,
            })),
            None => Ok(None),
        }
    }

    async fn records_for(&self, address: &Address) -> Result<Vec<EventRecord>> {
        let address = *address;
        let rows = self
            .blocking(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT e.canonical_bytes FROM events e
                     JOIN event_participants p ON p.seq = e.seq
                     WHERE p.address = ?1
                     ORDER BY e.seq",
                )?;
                let rows = stmt
                    .query_map(params![address.as_bytes().as_slice()], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<Vec<u8>>>>()?;
                Ok(rows)
            })
            .await?;
        decode_all(rows)
    }

    async fn len(&self) -> Result<u64> {
        let count: i64 = self
            .blocking(|conn| {
                conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
                    .map_err(StoreError::from)
            })
            .await?;
        Ok(count.max(0) as u64)
    }
}
