//! # Learnchain Core
//!
//! The state machine of the Learnchain learning platform: token ledger,
//! user and skill registry, learning sessions with escrowed payment,
//! reputation settlement, and achievement evaluation.
//!
//! This crate contains no I/O, no clock, no locking. Every operation is a
//! synchronous call on [`SessionEngine`] that either commits fully and
//! returns one [`Event`], or fails with a [`PlatformError`] and changes
//! nothing.
//!
//! ## Key Types
//!
//! - [`SessionEngine`] - Owner of all state; start, complete, cancel sessions
//! - [`Ledger`] - Balances per [`Address`], issuer-gated minting
//! - [`Registry`] - [`User`] profiles and [`Skill`] listings
//! - [`Session`] - One escrowed enrollment, `Active → Completed | Cancelled`
//! - [`EventRecord`] - A journaled event, content-addressed by [`EventId`]
//!
//! ## Canonicalization
//!
//! Event records are encoded using deterministic CBOR. See [`canonical`] module.

pub mod achievements;
pub mod canonical;
pub mod engine;
pub mod error;
pub mod event;
pub mod ledger;
pub mod policy;
pub mod registry;
pub mod session;
pub mod types;
pub mod validation;

pub use achievements::{default_rules, evaluate, AchievementRule, Metric};
pub use canonical::{decode_record, encode_record, record_id};
pub use engine::{Applied, SessionEngine, Settlement};
pub use error::{CodecError, PlatformError, Result};
pub use event::{Command, Event, EventRecord};
pub use ledger::{format_units, Ledger, TokenInfo};
pub use policy::SettlementPolicy;
pub use registry::{LeaderboardEntry, LeaderboardKind, Registry, Skill, SkillDraft, SkillQuery, User};
pub use session::{Session, SessionBook, SessionState};
pub use types::{Address, Amount, EventId, SessionId, SkillId, Timestamp};
