//! The Platform: the caller-facing engine.
//!
//! The Platform owns a [`SessionEngine`] behind a single async RwLock.
//! State-changing operations take the write lock, so they commit one at a
//! time in the order they acquire it; reads share the read lock and see the
//! last committed state.
//!
//! Commit path for every successful operation:
//! 1. Execute against the engine (all-or-nothing).
//! 2. Chain the event into a record (`seq`, `prev`, `timestamp`).
//! 3. Append the record to the journal.
//! 4. Publish the record on the event bus.
//!
//! Steps 3 and 4 can fail without undoing step 1: failures are logged and
//! counted, and the operation still reports success. A record the journal
//! did not accept stays in a backlog and is written, in order, before any
//! later record, so the journal never has a gap.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use learnchain_core::canonical::id_of_bytes;
use learnchain_core::{
    evaluate, Address, Amount, Applied, Command, Event, EventId, EventRecord, LeaderboardEntry,
    LeaderboardKind, PlatformError, Session, SessionEngine, SessionId, Settlement, Skill,
    SkillDraft, SkillId, SkillQuery, Timestamp, TokenInfo, User,
};
use learnchain_store::{AppendResult, JournalStore, MemoryJournal};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::events::{EventBus, RoomSubscription};
use crate::views::{SessionView, SkillView, UserProfileView};

/// Engine state guarded by the commit lock.
struct Committed {
    engine: SessionEngine,
    /// Id of the last record, `None` before the first commit.
    head: Option<EventId>,
    next_seq: u64,
    /// Committed records not yet accepted by the journal, oldest first.
    backlog: VecDeque<Pending>,
}

/// A committed record waiting for the journal.
struct Pending {
    record: Arc<EventRecord>,
    canonical: Vec<u8>,
}

/// The main Platform struct.
pub struct Platform<S: JournalStore, C: Clock = SystemClock> {
    state: RwLock<Committed>,
    journal: Arc<S>,
    clock: C,
    bus: EventBus,
    config: EngineConfig,
    journal_failures: AtomicU64,
}

impl Platform<MemoryJournal, SystemClock> {
    /// A platform with an in-memory journal and wall-clock time.
    pub async fn in_memory(config: EngineConfig) -> Result<Self> {
        Self::open(config, MemoryJournal::new(), SystemClock).await
    }
}

impl<S: JournalStore, C: Clock> Platform<S, C> {
    /// Open a platform over `journal`, replaying whatever it already holds.
    ///
    /// Replay checks sequence numbers and the hash chain, re-executes each
    /// operation at its recorded timestamp, and fails with
    /// [`EngineError::Replay`] if any re-executed event differs from the
    /// recorded one.
    pub async fn open(config: EngineConfig, journal: S, clock: C) -> Result<Self> {
        config.validate()?;

        let mut engine = SessionEngine::new(config.issuer, config.policy.clone());
        let records = journal.read_all().await?;
        let mut head = None;

        for (index, record) in records.iter().enumerate() {
            let expected = index as u64 + 1;
            if record.seq != expected {
                return Err(EngineError::Replay {
                    seq: record.seq,
                    reason: format!("expected seq {}", expected),
                });
            }
            if record.prev != head {
                return Err(EngineError::Replay {
                    seq: record.seq,
                    reason: "broken hash chain".into(),
                });
            }
            let replayed = engine
                .execute(record.event.command(), record.timestamp)
                .map_err(|e| EngineError::Replay {
                    seq: record.seq,
                    reason: format!("operation rejected: {}", e),
                })?;
            if replayed != record.event {
                return Err(EngineError::Replay {
                    seq: record.seq,
                    reason: format!("{} replayed to a different outcome", record.event.kind()),
                });
            }
            head = Some(record.compute_id()?);
        }

        verify_head(&journal, records.len() as u64, head).await?;
        if !records.is_empty() {
            info!(records = records.len(), "journal replayed");
        }

        Ok(Self {
            state: RwLock::new(Committed {
                engine,
                head,
                next_seq: records.len() as u64 + 1,
                backlog: VecDeque::new(),
            }),
            journal: Arc::new(journal),
            clock,
            bus: EventBus::new(config.events.capacity),
            config,
            journal_failures: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn journal(&self) -> &S {
        &self.journal
    }

    pub fn token(&self) -> &TokenInfo {
        &self.config.token
    }

    /// Journal appends that failed since the platform was opened.
    pub fn journal_failures(&self) -> u64 {
        self.journal_failures.load(Ordering::Relaxed)
    }

    /// Sequence number of the last committed record (0 before any commit).
    pub async fn last_seq(&self) -> u64 {
        self.state.read().await.next_seq - 1
    }

    /// Committed records the journal has not accepted yet.
    pub async fn unjournaled(&self) -> usize {
        self.state.read().await.backlog.len()
    }

    /// Retry writing the backlog to the journal.
    ///
    /// Returns the number of records still waiting afterwards.
    pub async fn flush_journal(&self) -> usize {
        let mut state = self.state.write().await;
        self.drain_backlog(&mut state.backlog).await;
        state.backlog.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Arc<EventRecord>> {
        self.bus.subscribe()
    }

    /// Join the room of one address (records where it participates).
    pub fn subscribe_address(&self, address: Address) -> RoomSubscription {
        self.bus.subscribe_address(address)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commit path
    // ─────────────────────────────────────────────────────────────────────────

    async fn commit<T, F>(&self, operation: &'static str, op: F) -> Result<T>
    where
        F: FnOnce(&mut SessionEngine, Timestamp) -> std::result::Result<Applied<T>, PlatformError>,
    {
        let mut state = self.state.write().await;
        let now = self.clock.now();

        let applied = match op(&mut state.engine, now) {
            Ok(applied) => applied,
            Err(e) => {
                debug!(operation, kind = e.kind(), error = %e, "operation rejected");
                return Err(e.into());
            }
        };

        let record = EventRecord {
            seq: state.next_seq,
            prev: state.head,
            timestamp: now,
            event: applied.event,
        };
        let record = match record.canonical_bytes() {
            Ok(canonical) => {
                state.next_seq += 1;
                state.head = Some(id_of_bytes(&canonical));
                let record = Arc::new(record);
                state.backlog.push_back(Pending {
                    record: record.clone(),
                    canonical,
                });
                self.drain_backlog(&mut state.backlog).await;
                record
            }
            Err(e) => {
                // Without bytes there is no id to chain to; the seq is reused.
                self.journal_failures.fetch_add(1, Ordering::Relaxed);
                error!(seq = record.seq, error = %e, "record encoding failed; not journaled");
                Arc::new(record)
            }
        };

        info!(
            operation,
            seq = record.seq,
            event_type = record.event.kind(),
            "operation committed"
        );
        self.bus.publish(record);
        Ok(applied.output)
    }

    /// Append backlog records in order, stopping at the first one the
    /// journal does not accept.
    async fn drain_backlog(&self, backlog: &mut VecDeque<Pending>) {
        while let Some(pending) = backlog.front() {
            let seq = pending.record.seq;
            match self.journal.append(&pending.record, &pending.canonical).await {
                Ok(AppendResult::Appended) => {}
                Ok(AppendResult::AlreadyExists) => {
                    warn!(seq, "record already journaled");
                }
                Ok(AppendResult::Conflict { existing }) => {
                    self.journal_failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        seq,
                        %existing,
                        waiting = backlog.len(),
                        "journal holds a different record at this seq"
                    );
                    return;
                }
                Err(e) => {
                    self.journal_failures.fetch_add(1, Ordering::Relaxed);
                    error!(seq, error = %e, waiting = backlog.len(), "journal append failed");
                    return;
                }
            }
            backlog.pop_front();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn register_user(
        &self,
        address: Address,
        username: &str,
        is_instructor: bool,
    ) -> Result<()> {
        self.commit("register_user", |engine, now| {
            engine.register_user(address, username, is_instructor, now)
        })
        .await
    }

    pub async fn create_skill(&self, instructor: Address, draft: SkillDraft) -> Result<SkillId> {
        self.commit("create_skill", |engine, now| {
            engine.create_skill(instructor, draft, now)
        })
        .await
    }

    pub async fn deactivate_skill(&self, caller: Address, skill_id: SkillId) -> Result<()> {
        self.commit("deactivate_skill", |engine, _| {
            engine.deactivate_skill(caller, skill_id)
        })
        .await
    }

    pub async fn start_session(&self, student: Address, skill_id: SkillId) -> Result<SessionId> {
        self.commit("start_session", |engine, now| {
            engine.start_session(student, skill_id, now)
        })
        .await
    }

    pub async fn complete_session(
        &self,
        caller: Address,
        session_id: SessionId,
        assessment_score: u32,
        rating: u32,
        feedback: &str,
    ) -> Result<Settlement> {
        self.commit("complete_session", |engine, now| {
            engine.complete_session(caller, session_id, assessment_score, rating, feedback, now)
        })
        .await
    }

    pub async fn cancel_session(&self, session_id: SessionId, by: Address) -> Result<Amount> {
        self.commit("cancel_session", |engine, now| {
            engine.cancel_session(session_id, by, now)
        })
        .await
    }

    pub async fn transfer(&self, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.commit("transfer", |engine, _| engine.transfer(from, to, amount))
            .await
    }

    pub async fn mint(&self, caller: Address, to: Address, amount: Amount) -> Result<()> {
        self.commit("mint", |engine, _| engine.mint(caller, to, amount))
            .await
    }

    /// Execute any command through the commit path and return its event.
    pub async fn submit(&self, command: Command) -> Result<Event> {
        let name = command.name();
        self.commit(name, |engine, now| {
            let event = engine.execute(command, now)?;
            Ok(Applied {
                output: event.clone(),
                event,
            })
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `f` against the last committed state.
    pub async fn read<R>(&self, f: impl FnOnce(&SessionEngine) -> R) -> R {
        let state = self.state.read().await;
        f(&state.engine)
    }

    pub async fn balance_of(&self, account: &Address) -> Amount {
        self.read(|e| e.balance_of(account)).await
    }

    pub async fn total_supply(&self) -> Amount {
        self.read(|e| e.ledger().total_supply()).await
    }

    pub async fn total_escrowed(&self) -> Amount {
        self.read(|e| e.total_escrowed()).await
    }

    pub async fn user(&self, address: &Address) -> Option<User> {
        self.read(|e| e.user(address).cloned()).await
    }

    pub async fn skill(&self, id: SkillId) -> Option<Skill> {
        self.read(|e| e.skill(id).cloned()).await
    }

    pub async fn session(&self, id: SessionId) -> Option<Session> {
        self.read(|e| e.session(id).cloned()).await
    }

    pub async fn skills_by_category(&self, category: &str) -> Vec<SkillId> {
        self.read(|e| e.registry().skills_by_category(category)).await
    }

    pub async fn total_skills(&self) -> u64 {
        self.read(|e| e.registry().total_skills()).await
    }

    pub async fn active_skills(&self) -> Vec<Skill> {
        self.read(|e| e.registry().active_skills().into_iter().cloned().collect())
            .await
    }

    pub async fn skills_by_instructor(&self, instructor: &Address) -> Vec<Skill> {
        self.read(|e| {
            e.registry()
                .skills_by_instructor(instructor)
                .into_iter()
                .cloned()
                .collect()
        })
        .await
    }

    pub async fn search(&self, query: &SkillQuery) -> Vec<Skill> {
        self.read(|e| e.registry().search(query).into_iter().cloned().collect())
            .await
    }

    pub async fn leaderboard(&self, kind: LeaderboardKind, limit: usize) -> Vec<LeaderboardEntry> {
        self.read(|e| e.registry().leaderboard(kind, limit)).await
    }

    pub async fn user_sessions(&self, address: &Address) -> Vec<Session> {
        self.read(|e| e.user_sessions(address).into_iter().cloned().collect())
            .await
    }

    /// Achievements the user currently holds under the configured rules.
    pub async fn achievements(&self, address: &Address) -> Result<Vec<String>> {
        let rules = &self.config.achievements;
        self.read(|e| -> Result<Vec<String>> {
            let user = e.registry().require_user(address)?;
            Ok(evaluate(user, rules))
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn skill_view(&self, id: SkillId) -> Option<SkillView> {
        let token = &self.config.token;
        self.read(|e| e.skill(id).map(|s| SkillView::new(s, token)))
            .await
    }

    pub async fn profile(&self, address: &Address) -> Option<UserProfileView> {
        let token = &self.config.token;
        let rules = &self.config.achievements;
        self.read(|e| {
            e.user(address).map(|user| {
                UserProfileView::new(user, e.balance_of(address), evaluate(user, rules), token)
            })
        })
        .await
    }

    pub async fn session_view(&self, id: SessionId) -> Option<SessionView> {
        let token = &self.config.token;
        self.read(|e| e.session(id).map(|s| SessionView::new(s, token)))
            .await
    }

    /// A journaled record by id.
    pub async fn record(&self, id: &EventId) -> Result<Option<EventRecord>> {
        Ok(self.journal.get_by_id(id).await?)
    }

    /// Journal records concerning `address`, oldest first.
    pub async fn history(&self, address: &Address) -> Result<Vec<EventRecord>> {
        Ok(self.journal.records_for(address).await?)
    }
}

/// Check the journal's own head against the replayed chain.
///
/// The stored bytes of the last record must hash to the id replay derived
/// from the decoded record, so a non-canonical or altered row is caught.
async fn verify_head<S: JournalStore>(journal: &S, last: u64, head: Option<EventId>) -> Result<()> {
    let stored = journal.head().await?;
    match (stored, head) {
        (None, None) => Ok(()),
        (Some(stored), Some(head)) if stored.seq == last && stored.id == head => {
            let bytes = journal.canonical_bytes(last).await?;
            if bytes.as_deref().map(id_of_bytes) == Some(head) {
                Ok(())
            } else {
                Err(EngineError::Replay {
                    seq: last,
                    reason: "stored bytes do not match the record".into(),
                })
            }
        }
        (stored, _) => Err(EngineError::Replay {
            seq: last,
            reason: format!(
                "journal head {:?} disagrees with replayed head",
                stored.map(|h| h.seq)
            ),
        }),
    }
}
