//! Learning sessions and their lifecycle states.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};
use crate::types::{Address, Amount, SessionId, SkillId, Timestamp};

/// Lifecycle state of a session.
///
/// `Active` is the only non-terminal state. A session never leaves
/// `Completed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Active,
    Completed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionState::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Active => "active",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
        }
    }
}

/// One enrollment of a student in a skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub skill_id: SkillId,
    pub student: Address,
    pub instructor: Address,
    pub state: SessionState,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    /// Price paid at start.
    pub price: Amount,
    /// Funds currently held for this session. Zero once released.
    pub escrow: Amount,
    pub assessment_score: Option<u32>,
    pub rating: Option<u32>,
    pub feedback: Option<String>,
    /// Reward minted to the student on completion.
    pub reward: Amount,
}

impl Session {
    /// Fail with `InvalidState` unless the session is still active.
    pub fn ensure_active(&self) -> Result<()> {
        if self.state != SessionState::Active {
            return Err(PlatformError::InvalidState {
                session_id: self.id,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Whether `address` is a party to this session.
    pub fn involves(&self, address: &Address) -> bool {
        self.student == *address || self.instructor == *address
    }
}

/// Session storage with per-user lookup.
#[derive(Debug, Clone)]
pub struct SessionBook {
    sessions: BTreeMap<SessionId, Session>,
    by_user: HashMap<Address, Vec<SessionId>>,
    next_id: SessionId,
}

impl Default for SessionBook {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBook {
    pub fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
            by_user: HashMap::new(),
            next_id: SessionId::FIRST,
        }
    }

    /// Create an active session holding `price` in escrow.
    pub(crate) fn open(
        &mut self,
        skill_id: SkillId,
        student: Address,
        instructor: Address,
        price: Amount,
        now: Timestamp,
    ) -> SessionId {
        let id = self.next_id;
        self.next_id = id.next();

        self.by_user.entry(student).or_default().push(id);
        self.by_user.entry(instructor).or_default().push(id);
        self.sessions.insert(
            id,
            Session {
                id,
                skill_id,
                student,
                instructor,
                state: SessionState::Active,
                started_at: now,
                ended_at: None,
                price,
                escrow: price,
                assessment_score: None,
                rating: None,
                feedback: None,
                reward: 0,
            },
        );
        id
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Fetch a session or fail with `SessionNotFound`.
    pub fn require(&self, id: SessionId) -> Result<&Session> {
        self.sessions
            .get(&id)
            .ok_or(PlatformError::SessionNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Sessions where `address` is student or instructor, in id order.
    pub fn for_user(&self, address: &Address) -> Vec<&Session> {
        self.by_user
            .get(address)
            .map(|ids| ids.iter().filter_map(|id| self.sessions.get(id)).collect())
            .unwrap_or_default()
    }

    /// Sum of funds held by all active sessions.
    pub fn total_escrowed(&self) -> Amount {
        self.sessions.values().map(|s| s.escrow).sum()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}
