//! JournalStore trait: the abstract interface for event persistence.
//!
//! The journal is an append-only, hash-chained sequence of
//! [`EventRecord`]s. The engine writes it and replays it on restart; it
//! never reads it on the commit path.

use async_trait::async_trait;
use bytes::Bytes;
use learnchain_core::{Address, EventId, EventRecord};

use crate::error::Result;

/// Result of appending a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendResult {
    /// Record was appended.
    Appended,
    /// The identical record is already stored (idempotent, not an error).
    AlreadyExists,
    /// A different record occupies this sequence number.
    Conflict {
        /// The id of the record already stored there.
        existing: EventId,
    },
}

/// The last record in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalHead {
    pub seq: u64,
    pub id: EventId,
}

/// Async interface for event persistence.
///
/// For SQLite, implementations use `spawn_blocking` internally to avoid
/// blocking the runtime.
#[async_trait]
pub trait JournalStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a record.
    ///
    /// # Arguments
    /// - `record`: The record to store.
    /// - `canonical`: Its canonical bytes (cached to avoid re-encoding).
    ///
    /// # Returns
    /// - `Appended` if the sequence number was free.
    /// - `AlreadyExists` if the exact same record is already stored.
    /// - `Conflict` if a different record holds that sequence number.
    async fn append(&self, record: &EventRecord, canonical: &[u8]) -> Result<AppendResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a record by sequence number.
    async fn get(&self, seq: u64) -> Result<Option<EventRecord>>;

    /// Get a record by its content-addressed id.
    async fn get_by_id(&self, id: &EventId) -> Result<Option<EventRecord>>;

    /// Get the stored canonical bytes of a record.
    async fn canonical_bytes(&self, seq: u64) -> Result<Option<Bytes>>;

    /// Records with `start <= seq <= end`, ordered by seq.
    async fn range(&self, start: u64, end: u64) -> Result<Vec<EventRecord>>;

    /// The last record, or `None` for an empty journal.
    async fn head(&self) -> Result<Option<JournalHead>>;

    /// Records whose event concerns `address`, ordered by seq.
    async fn records_for(&self, address: &Address) -> Result<Vec<EventRecord>>;

    /// Number of stored records.
    async fn len(&self) -> Result<u64>;

    /// Every record, ordered by seq.
    async fn read_all(&self) -> Result<Vec<EventRecord>> {
        self.range(0, u64::MAX).await
    }
}
