//! Error types for the Learnchain core.

use thiserror::Error;

use crate::session::SessionState;
use crate::types::{Address, Amount, SessionId, SkillId};

/// Errors a platform operation can fail with.
///
/// Every variant is recoverable by the caller. A failed operation leaves
/// no partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("address {0} is not registered")]
    NotRegistered(Address),

    #[error("address {0} is already registered")]
    AlreadyRegistered(Address),

    #[error("username {0:?} is already taken")]
    UsernameTaken(String),

    #[error("address {0} is not an instructor")]
    NotInstructor(Address),

    #[error("invalid price {0}: must be greater than zero")]
    InvalidPrice(Amount),

    #[error("skill {0} not found")]
    SkillNotFound(SkillId),

    #[error("skill {0} is not active")]
    SkillInactive(SkillId),

    #[error("instructor {student} cannot enroll in own skill {skill_id}")]
    SelfEnrollment { skill_id: SkillId, student: Address },

    #[error("insufficient balance for {account}: needed {needed}, available {available}")]
    InsufficientBalance {
        account: Address,
        needed: Amount,
        available: Amount,
    },

    #[error("session {session_id} is {state:?}, expected Active")]
    InvalidState {
        session_id: SessionId,
        state: SessionState,
    },

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("rating {rating} outside [{min}, {max}]")]
    InvalidRating { rating: u32, min: u32, max: u32 },

    #[error("assessment score {score} exceeds maximum {max}")]
    InvalidScore { score: u32, max: u32 },

    #[error("{caller} is not authorized to {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    #[error("invalid amount {0}: must be greater than zero")]
    InvalidAmount(Amount),

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
}

impl PlatformError {
    /// The offending input field, where one applies.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            PlatformError::UsernameTaken(_) => Some("username"),
            PlatformError::InvalidPrice(_) => Some("price"),
            PlatformError::InvalidRating { .. } => Some("rating"),
            PlatformError::InvalidScore { .. } => Some("assessment_score"),
            PlatformError::InvalidAmount(_) => Some("amount"),
            PlatformError::InvalidField { field, .. } => Some(*field),
            PlatformError::SkillNotFound(_) | PlatformError::SkillInactive(_) => Some("skill_id"),
            PlatformError::SessionNotFound(_) | PlatformError::InvalidState { .. } => {
                Some("session_id")
            }
            _ => None,
        }
    }

    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PlatformError::NotRegistered(_) => "NotRegistered",
            PlatformError::AlreadyRegistered(_) => "AlreadyRegistered",
            PlatformError::UsernameTaken(_) => "UsernameTaken",
            PlatformError::NotInstructor(_) => "NotInstructor",
            PlatformError::InvalidPrice(_) => "InvalidPrice",
            PlatformError::SkillNotFound(_) => "SkillNotFound",
            PlatformError::SkillInactive(_) => "SkillInactive",
            PlatformError::SelfEnrollment { .. } => "SelfEnrollment",
            PlatformError::InsufficientBalance { .. } => "InsufficientBalance",
            PlatformError::InvalidState { .. } => "InvalidState",
            PlatformError::SessionNotFound(_) => "SessionNotFound",
            PlatformError::InvalidRating { .. } => "InvalidRating",
            PlatformError::InvalidScore { .. } => "InvalidScore",
            PlatformError::Unauthorized { .. } => "Unauthorized",
            PlatformError::InvalidAmount(_) => "InvalidAmount",
            PlatformError::InvalidField { .. } => "InvalidField",
            PlatformError::Overflow(_) => "Overflow",
        }
    }
}

/// Errors from canonical encoding and decoding of event records.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unsupported record version: {0}")]
    UnsupportedVersion(u8),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
