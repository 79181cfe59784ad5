//! In-memory implementation of the JournalStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use learnchain_core::canonical::id_of_bytes;
use learnchain_core::{Address, EventId, EventRecord};

use crate::error::{Result, StoreError};
use crate::traits::{AppendResult, JournalHead, JournalStore};

/// In-memory journal.
///
/// All data is lost when the journal is dropped. Thread-safe via RwLock.
pub struct MemoryJournal {
    inner: RwLock<MemoryJournalInner>,
}

#[derive(Default)]
struct MemoryJournalInner {
    /// Records indexed by seq.
    records: BTreeMap<u64, StoredRecord>,

    /// Id index: event_id -> seq.
    ids: HashMap<EventId, u64>,

    /// Participant index: address -> seqs, ascending.
    participants: HashMap<Address, Vec<u64>>,
}

struct StoredRecord {
    record: EventRecord,
    id: EventId,
    canonical: Bytes,
}

impl MemoryJournal {
    /// Create a new empty journal.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryJournalInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryJournalInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryJournalInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JournalStore for MemoryJournal {
    async fn append(&self, record: &EventRecord, canonical: &[u8]) -> Result<AppendResult> {
        let mut inner = self.write()?;
        let id = id_of_bytes(canonical);

        if let Some(existing) = inner.records.get(&record.seq) {
            if existing.id == id {
                return Ok(AppendResult::AlreadyExists);
            }
            return Ok(AppendResult::Conflict {
                existing: existing.id,
            });
        }

        for address in record.event.participants() {
            inner
                .participants
                .entry(address)
                .or_default()
                .push(record.seq);
        }
        inner.ids.insert(id, record.seq);
        inner.records.insert(
            record.seq,
            StoredRecord {
                record: record.clone(),
                id,
                canonical: Bytes::copy_from_slice(canonical),
            },
        );

        Ok(AppendResult::Appended)
    }

    async fn get(&self, seq: u64) -> Result<Option<EventRecord>> {
        let inner = self.read()?;
        Ok(inner.records.get(&seq).map(|sr| sr.record.clone()))
    }

    async fn get_by_id(&self, id: &EventId) -> Result<Option<EventRecord>> {
        let inner = self.read()?;
        Ok(inner
            .ids
            .get(id)
            .and_then(|seq| inner.records.get(seq))
            .map(|sr| sr.record.clone()))
    }

    async fn canonical_bytes(&self, seq: u64) -> Result<Option<Bytes>> {
        let inner = self.read()?;
        Ok(inner.records.get(&seq).map(|sr| sr.canonical.clone()))
    }

    async fn range(&self, start: u64, end: u64) -> Result<Vec<EventRecord>> {
        if start > end {
            return Ok(Vec::new());
        }
        let inner = self.read()?;
        Ok(inner
            .records
            .range(start..=end)
            .map(|(_, sr)| sr.record.clone())
            .collect())
    }

    async fn head(&self) -> Result<Option<JournalHead>> {
        let inner = self.read()?;
        Ok(inner
            .records
            .iter()
            .next_back()
            .map(|(seq, sr)| JournalHead { seq: *seq, id: sr.id }))
    }

    async fn records_for(&self, address: &Address) -> Result<Vec<EventRecord>> {
        let inner = self.read()?;
        let Some(seqs) = inner.participants.get(address) else {
            return Ok(Vec::new());
        };
        let mut seqs = seqs.clone();
        seqs.sort_unstable();
        Ok(seqs
            .iter()
            .filter_map(|seq| inner.records.get(seq))
            .map(|sr| sr.record.clone())
            .collect())
    }

    async fn len(&self) -> Result<u64> {
        let inner = self.read()?;
        Ok(inner.records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnchain_core::Event;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn record(seq: u64, prev: Option<EventId>, amount: u128) -> (EventRecord, Vec<u8>) {
        let record = EventRecord {
            seq,
            prev,
            timestamp: 1_000 + seq as i64,
            event: Event::Transfer {
                from: addr(1),
                to: addr(2),
                amount,
            },
        };
        let canonical = record.canonical_bytes().unwrap();
        (record, canonical)
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let journal = MemoryJournal::new();
        let (r, bytes) = record(1, None, 5);

        assert_eq!(journal.append(&r, &bytes).await.unwrap(), AppendResult::Appended);
        assert_eq!(journal.get(1).await.unwrap(), Some(r.clone()));

        let id = r.compute_id().unwrap();
        assert_eq!(journal.get_by_id(&id).await.unwrap(), Some(r));
        assert_eq!(
            journal.canonical_bytes(1).await.unwrap().unwrap().as_ref(),
            bytes.as_slice()
        );
        assert_eq!(journal.head().await.unwrap(), Some(JournalHead { seq: 1, id }));
    }

    #[tokio::test]
    async fn test_idempotent_append() {
        let journal = MemoryJournal::new();
        let (r, bytes) = record(1, None, 5);
        journal.append(&r, &bytes).await.unwrap();
        assert_eq!(
            journal.append(&r, &bytes).await.unwrap(),
            AppendResult::AlreadyExists
        );
        assert_eq!(journal.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_conflict_at_same_seq() {
        let journal = MemoryJournal::new();
        let (a, a_bytes) = record(1, None, 5);
        let (b, b_bytes) = record(1, None, 6);
        journal.append(&a, &a_bytes).await.unwrap();

        let result = journal.append(&b, &b_bytes).await.unwrap();
        assert_eq!(
            result,
            AppendResult::Conflict {
                existing: a.compute_id().unwrap()
            }
        );
        assert_eq!(journal.get(1).await.unwrap(), Some(a));
    }

    #[tokio::test]
    async fn test_range_and_participants() {
        let journal = MemoryJournal::new();
        let mut prev = None;
        for seq in 1..=4 {
            let (r, bytes) = record(seq, prev, seq as u128);
            journal.append(&r, &bytes).await.unwrap();
            prev = Some(r.compute_id().unwrap());
        }

        let middle = journal.range(2, 3).await.unwrap();
        assert_eq!(middle.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(journal.read_all().await.unwrap().len(), 4);
        assert_eq!(journal.records_for(&addr(2)).await.unwrap().len(), 4);
        assert!(journal.records_for(&addr(9)).await.unwrap().is_empty());
        assert!(journal.range(3, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_head() {
        let journal = MemoryJournal::new();
        assert_eq!(journal.head().await.unwrap(), None);
        assert_eq!(journal.len().await.unwrap(), 0);
    }
}
