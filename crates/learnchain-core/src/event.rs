//! Events emitted by committed operations, and the commands they replay to.
//!
//! Every committed operation produces exactly one [`Event`]. An event
//! carries the inputs of its operation, so [`Event::command`] recovers a
//! [`Command`] that re-executes it, plus the outcome fields indexers need.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::registry::SkillDraft;
use crate::types::{Address, Amount, EventId, SessionId, SkillId, Timestamp};

/// Notification of one committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    UserRegistered {
        address: Address,
        username: String,
        is_instructor: bool,
    },
    SkillCreated {
        skill_id: SkillId,
        instructor: Address,
        draft: SkillDraft,
    },
    SkillDeactivated {
        skill_id: SkillId,
        instructor: Address,
    },
    SessionStarted {
        session_id: SessionId,
        skill_id: SkillId,
        student: Address,
        instructor: Address,
        price: Amount,
    },
    /// Settlement of a session, including its assessment result.
    SessionCompleted {
        session_id: SessionId,
        skill_id: SkillId,
        student: Address,
        instructor: Address,
        assessment_score: u32,
        passed: bool,
        rating: u32,
        feedback: String,
        price: Amount,
        reward: Amount,
        reputation_delta: u64,
    },
    SessionCancelled {
        session_id: SessionId,
        skill_id: SkillId,
        cancelled_by: Address,
        student: Address,
        instructor: Address,
        refund: Amount,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Minted {
        issuer: Address,
        to: Address,
        amount: Amount,
    },
}

impl Event {
    /// Stable name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::UserRegistered { .. } => "UserRegistered",
            Event::SkillCreated { .. } => "SkillCreated",
            Event::SkillDeactivated { .. } => "SkillDeactivated",
            Event::SessionStarted { .. } => "SessionStarted",
            Event::SessionCompleted { .. } => "SessionCompleted",
            Event::SessionCancelled { .. } => "SessionCancelled",
            Event::Transfer { .. } => "Transfer",
            Event::Minted { .. } => "Minted",
        }
    }

    /// Addresses this event concerns, deduplicated, in field order.
    pub fn participants(&self) -> Vec<Address> {
        let raw: Vec<Address> = match self {
            Event::UserRegistered { address, .. } => vec![*address],
            Event::SkillCreated { instructor, .. } | Event::SkillDeactivated { instructor, .. } => {
                vec![*instructor]
            }
            Event::SessionStarted {
                student, instructor, ..
            }
            | Event::SessionCompleted {
                student, instructor, ..
            } => vec![*student, *instructor],
            Event::SessionCancelled {
                cancelled_by,
                student,
                instructor,
                ..
            } => vec![*student, *instructor, *cancelled_by],
            Event::Transfer { from, to, .. } => vec![*from, *to],
            Event::Minted { issuer, to, .. } => vec![*to, *issuer],
        };
        let mut out = Vec::with_capacity(raw.len());
        for address in raw {
            if !out.contains(&address) {
                out.push(address);
            }
        }
        out
    }

    /// The command that produced this event.
    pub fn command(&self) -> Command {
        match self {
            Event::UserRegistered {
                address,
                username,
                is_instructor,
            } => Command::RegisterUser {
                address: *address,
                username: username.clone(),
                is_instructor: *is_instructor,
            },
            Event::SkillCreated {
                instructor, draft, ..
            } => Command::CreateSkill {
                instructor: *instructor,
                draft: draft.clone(),
            },
            Event::SkillDeactivated {
                skill_id,
                instructor,
            } => Command::DeactivateSkill {
                caller: *instructor,
                skill_id: *skill_id,
            },
            Event::SessionStarted {
                skill_id, student, ..
            } => Command::StartSession {
                student: *student,
                skill_id: *skill_id,
            },
            Event::SessionCompleted {
                session_id,
                student,
                assessment_score,
                rating,
                feedback,
                ..
            } => Command::CompleteSession {
                caller: *student,
                session_id: *session_id,
                assessment_score: *assessment_score,
                rating: *rating,
                feedback: feedback.clone(),
            },
            Event::SessionCancelled {
                session_id,
                cancelled_by,
                ..
            } => Command::CancelSession {
                caller: *cancelled_by,
                session_id: *session_id,
            },
            Event::Transfer { from, to, amount } => Command::Transfer {
                from: *from,
                to: *to,
                amount: *amount,
            },
            Event::Minted { issuer, to, amount } => Command::Mint {
                caller: *issuer,
                to: *to,
                amount: *amount,
            },
        }
    }
}

/// A state-changing request to the session engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    RegisterUser {
        address: Address,
        username: String,
        is_instructor: bool,
    },
    CreateSkill {
        instructor: Address,
        draft: SkillDraft,
    },
    DeactivateSkill {
        caller: Address,
        skill_id: SkillId,
    },
    StartSession {
        student: Address,
        skill_id: SkillId,
    },
    CompleteSession {
        caller: Address,
        session_id: SessionId,
        assessment_score: u32,
        rating: u32,
        feedback: String,
    },
    CancelSession {
        caller: Address,
        session_id: SessionId,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Mint {
        caller: Address,
        to: Address,
        amount: Amount,
    },
}

impl Command {
    /// Operation name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::RegisterUser { .. } => "register_user",
            Command::CreateSkill { .. } => "create_skill",
            Command::DeactivateSkill { .. } => "deactivate_skill",
            Command::StartSession { .. } => "start_session",
            Command::CompleteSession { .. } => "complete_session",
            Command::CancelSession { .. } => "cancel_session",
            Command::Transfer { .. } => "transfer",
            Command::Mint { .. } => "mint",
        }
    }
}

/// An event placed in the journal.
///
/// Records form a hash chain: each `prev` is the id of the record at
/// `seq - 1`, and the first record (seq 1) has no predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub seq: u64,
    pub prev: Option<EventId>,
    pub timestamp: Timestamp,
    pub event: Event,
}

impl EventRecord {
    /// Content-addressed id of this record.
    pub fn compute_id(&self) -> Result<EventId, CodecError> {
        crate::canonical::record_id(self)
    }

    /// Canonical bytes of this record.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CodecError> {
        crate::canonical::encode_record(self)
    }
}
