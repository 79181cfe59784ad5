//! Journal persistence and replay.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use learnchain::core::canonical::id_of_bytes;
use learnchain::core::EventId;
use learnchain::store::{AppendResult, JournalHead, StoreError};
use learnchain::{
    Address, EngineConfig, EngineError, Event, EventRecord, JournalStore, ManualClock,
    MemoryJournal, Platform, SessionState, SkillDraft, SkillId, SqliteJournal,
};

const START: i64 = 1_700_000_000;

fn config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.policy.base_reward = 200;
    config
}

fn draft() -> SkillDraft {
    SkillDraft {
        title: "Sourdough".into(),
        description: "Starter to loaf".into(),
        category: "Cooking".into(),
        duration: 120,
        price: 40,
        content_hash: String::new(),
    }
}

/// Append `events` to `journal` as a correctly chained sequence.
async fn seed(journal: &MemoryJournal, events: Vec<Event>) {
    let mut prev = None;
    for (i, event) in events.into_iter().enumerate() {
        let record = EventRecord {
            seq: i as u64 + 1,
            prev,
            timestamp: START + i as i64,
            event,
        };
        let bytes = record.canonical_bytes().unwrap();
        prev = Some(id_of_bytes(&bytes));
        journal.append(&record, &bytes).await.unwrap();
    }
}

#[tokio::test]
async fn test_sqlite_journal_restores_state() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("learnchain.db");
    let teacher = Address::derive("teacher");
    let student = Address::derive("student");
    let issuer = config().issuer;

    let (session_open, session_done) = {
        let platform =
            Platform::open(config(), SqliteJournal::open(&path)?, ManualClock::new(START)).await?;
        platform.register_user(teacher, "teacher", true).await?;
        platform.register_user(student, "student", false).await?;
        let skill = platform.create_skill(teacher, draft()).await?;
        platform.mint(issuer, student, 100).await?;
        let done = platform.start_session(student, skill).await?;
        platform.complete_session(student, done, 50, 350, "tasty").await?;
        let open = platform.start_session(student, skill).await?;
        assert_eq!(platform.journal_failures(), 0);
        (open, done)
    };

    let platform =
        Platform::open(config(), SqliteJournal::open(&path)?, ManualClock::new(START + 60)).await?;
    assert_eq!(platform.last_seq().await, 7);
    assert_eq!(platform.balance_of(&teacher).await, 40);
    // 100 minted, 2 x 40 paid, 200 * 50 / 100 rewarded.
    assert_eq!(platform.balance_of(&student).await, 100 - 80 + 100);
    assert_eq!(platform.total_escrowed().await, 40);
    assert_eq!(
        platform.session(session_done).await.map(|s| s.state),
        Some(SessionState::Completed)
    );
    assert_eq!(platform.skill(SkillId(1)).await.unwrap().average_rating, 350);
    assert_eq!(platform.user(&teacher).await.unwrap().reputation_score, 3);

    // The chain continues from the restored head.
    platform.cancel_session(session_open, student).await?;
    let records = platform.journal().read_all().await?;
    assert_eq!(records.len(), 8);
    assert_eq!(records[7].prev, Some(records[6].compute_id()?));
    assert_eq!(records[7].timestamp, START + 60);
    assert_eq!(platform.balance_of(&student).await, 160);
    Ok(())
}

#[tokio::test]
async fn test_replay_rejects_unauthorized_mint() {
    let journal = MemoryJournal::new();
    let rogue = Address::derive("rogue");
    seed(
        &journal,
        vec![Event::Minted {
            issuer: rogue,
            to: rogue,
            amount: 1_000,
        }],
    )
    .await;

    let err = Platform::open(config(), journal, ManualClock::new(START))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::Replay { seq: 1, .. }));
}

#[tokio::test]
async fn test_replay_rejects_altered_outcome() {
    let journal = MemoryJournal::new();
    let teacher = Address::derive("teacher");
    seed(
        &journal,
        vec![
            Event::UserRegistered {
                address: teacher,
                username: "teacher".into(),
                is_instructor: true,
            },
            Event::SkillCreated {
                skill_id: SkillId(9),
                instructor: teacher,
                draft: draft(),
            },
        ],
    )
    .await;

    let err = Platform::open(config(), journal, ManualClock::new(START))
        .await
        .err()
        .unwrap();
    match err {
        EngineError::Replay { seq, reason } => {
            assert_eq!(seq, 2);
            assert!(reason.contains("SkillCreated"));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[tokio::test]
async fn test_replay_rejects_broken_chain() {
    let journal = MemoryJournal::new();
    let address = Address::derive("someone");
    for seq in 1..=2u64 {
        let record = EventRecord {
            seq,
            prev: None,
            timestamp: START,
            event: Event::UserRegistered {
                address,
                username: format!("user{seq}"),
                is_instructor: false,
            },
        };
        let bytes = record.canonical_bytes().unwrap();
        journal.append(&record, &bytes).await.unwrap();
    }

    let err = Platform::open(config(), journal, ManualClock::new(START))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::Replay { seq: 2, .. }));
}

#[tokio::test]
async fn test_replay_uses_recorded_timestamps() {
    let journal = MemoryJournal::new();
    let address = Address::derive("someone");
    seed(
        &journal,
        vec![Event::UserRegistered {
            address,
            username: "someone".into(),
            is_instructor: false,
        }],
    )
    .await;

    let platform = Platform::open(config(), journal, ManualClock::new(START + 999))
        .await
        .unwrap();
    assert_eq!(platform.user(&address).await.unwrap().registered_at, START);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = config();
    config.events.capacity = 0;
    let result = Platform::open(config, MemoryJournal::new(), ManualClock::new(START)).await;
    assert!(matches!(result, Err(EngineError::Config(_))));
}

/// A journal over shared memory that can be told to fail appends or to
/// serve altered bytes.
struct FlakyJournal {
    inner: Arc<MemoryJournal>,
    failing_appends: AtomicUsize,
    alter_bytes: AtomicBool,
}

impl FlakyJournal {
    fn new(inner: Arc<MemoryJournal>) -> Self {
        Self {
            inner,
            failing_appends: AtomicUsize::new(0),
            alter_bytes: AtomicBool::new(false),
        }
    }

    fn fail_next_appends(&self, count: usize) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl JournalStore for FlakyJournal {
    async fn append(
        &self,
        record: &EventRecord,
        canonical: &[u8],
    ) -> learnchain::store::Result<AppendResult> {
        let failing = self.failing_appends.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_appends.store(failing - 1, Ordering::SeqCst);
            return Err(StoreError::Task("disk unavailable".into()));
        }
        self.inner.append(record, canonical).await
    }

    async fn get(&self, seq: u64) -> learnchain::store::Result<Option<EventRecord>> {
        self.inner.get(seq).await
    }

    async fn get_by_id(&self, id: &EventId) -> learnchain::store::Result<Option<EventRecord>> {
        self.inner.get_by_id(id).await
    }

    async fn canonical_bytes(&self, seq: u64) -> learnchain::store::Result<Option<Bytes>> {
        let bytes = self.inner.canonical_bytes(seq).await?;
        if self.alter_bytes.load(Ordering::SeqCst) {
            return Ok(bytes.map(|b| {
                let mut altered = b.to_vec();
                altered.push(0);
                Bytes::from(altered)
            }));
        }
        Ok(bytes)
    }

    async fn range(&self, start: u64, end: u64) -> learnchain::store::Result<Vec<EventRecord>> {
        self.inner.range(start, end).await
    }

    async fn head(&self) -> learnchain::store::Result<Option<JournalHead>> {
        self.inner.head().await
    }

    async fn records_for(&self, address: &Address) -> learnchain::store::Result<Vec<EventRecord>> {
        self.inner.records_for(address).await
    }

    async fn len(&self) -> learnchain::store::Result<u64> {
        self.inner.len().await
    }
}

#[tokio::test]
async fn test_failed_append_is_written_before_the_next_record() {
    let shared = Arc::new(MemoryJournal::new());
    let platform = Platform::open(
        config(),
        FlakyJournal::new(shared.clone()),
        ManualClock::new(START),
    )
    .await
    .unwrap();
    let (a, b, c) = (
        Address::derive("a"),
        Address::derive("b"),
        Address::derive("c"),
    );

    platform.register_user(a, "a", false).await.unwrap();
    platform.journal().fail_next_appends(1);
    platform.register_user(b, "b", false).await.unwrap();

    assert_eq!(platform.journal_failures(), 1);
    assert_eq!(platform.unjournaled().await, 1);
    assert_eq!(shared.len().await.unwrap(), 1);
    assert!(platform.user(&b).await.is_some());

    platform.register_user(c, "c", false).await.unwrap();
    assert_eq!(platform.unjournaled().await, 0);
    let seqs: Vec<u64> = shared.read_all().await.unwrap().iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);

    let reopened = Platform::open(config(), FlakyJournal::new(shared), ManualClock::new(START))
        .await
        .unwrap();
    assert_eq!(reopened.last_seq().await, 3);
    for address in [a, b, c] {
        assert!(reopened.user(&address).await.is_some());
    }
}

#[tokio::test]
async fn test_flush_retries_backlog() {
    let shared = Arc::new(MemoryJournal::new());
    let platform = Platform::open(
        config(),
        FlakyJournal::new(shared.clone()),
        ManualClock::new(START),
    )
    .await
    .unwrap();
    let issuer = platform.config().issuer;
    let holder = Address::derive("holder");

    platform.journal().fail_next_appends(2);
    platform.mint(issuer, holder, 10).await.unwrap();
    assert_eq!(platform.flush_journal().await, 1);
    assert_eq!(platform.journal_failures(), 2);
    assert_eq!(platform.flush_journal().await, 0);

    let reopened = Platform::open(config(), FlakyJournal::new(shared), ManualClock::new(START))
        .await
        .unwrap();
    assert_eq!(reopened.balance_of(&holder).await, 10);
}

#[tokio::test]
async fn test_open_rejects_altered_stored_bytes() {
    let shared = Arc::new(MemoryJournal::new());
    seed(
        &shared,
        vec![Event::UserRegistered {
            address: Address::derive("someone"),
            username: "someone".into(),
            is_instructor: false,
        }],
    )
    .await;

    let journal = FlakyJournal::new(shared.clone());
    journal.alter_bytes.store(true, Ordering::SeqCst);
    let err = Platform::open(config(), journal, ManualClock::new(START))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::Replay { seq: 1, .. }));

    assert!(
        Platform::open(config(), FlakyJournal::new(shared), ManualClock::new(START))
            .await
            .is_ok()
    );
}
