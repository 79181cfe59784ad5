//! # Learnchain
//!
//! A learning-platform engine: instructors list skills, students pay into
//! escrow to start sessions, and settlement pays the instructor, mints a
//! score-based reward to the student, and folds the rating into the
//! instructor's reputation.
//!
//! This crate wraps the pure state machine from [`learnchain_core`] with:
//! - a single-writer commit path ([`Platform`])
//! - a hash-chained event journal ([`learnchain_store`])
//! - per-address event rooms ([`EventBus`])
//! - TOML configuration and structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use learnchain::{EngineConfig, Platform, SkillDraft};
//! use learnchain::core::Address;
//!
//! #[tokio::main]
//! async fn main() -> learnchain::Result<()> {
//!     let platform = Platform::in_memory(EngineConfig::default()).await?;
//!     let teacher = Address::derive("teacher");
//!     let student = Address::derive("student");
//!
//!     platform.register_user(teacher, "teacher", true).await?;
//!     platform.register_user(student, "student", false).await?;
//!
//!     let skill = platform
//!         .create_skill(
//!             teacher,
//!             SkillDraft {
//!                 title: "Rust".into(),
//!                 description: "Ownership and borrowing".into(),
//!                 category: "Programming".into(),
//!                 duration: 60,
//!                 price: 100,
//!                 content_hash: String::new(),
//!             },
//!         )
//!         .await?;
//!
//!     let issuer = platform.config().issuer;
//!     platform.mint(issuer, student, 100).await?;
//!     let session = platform.start_session(student, skill).await?;
//!     let settlement = platform
//!         .complete_session(student, session, 85, 450, "great")
//!         .await?;
//!     println!("reward: {}", settlement.reward);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod platform;
pub mod views;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, EventsConfig, LogConfig};
pub use error::{EngineError, Result};
pub use events::{room_name, EventBus, RoomSubscription};
pub use logging::{init_logging, try_init_logging, LogFormat};
pub use platform::Platform;
pub use views::{SessionView, SkillView, UserProfileView};

// Re-export the crates callers need alongside the platform.
pub use learnchain_core as core;
pub use learnchain_store as store;

pub use learnchain_core::{
    Address, Amount, Command, Event, EventRecord, LeaderboardKind, PlatformError, Session,
    SessionId, SessionState, Settlement, Skill, SkillDraft, SkillId, SkillQuery, User,
};
pub use learnchain_store::{JournalStore, MemoryJournal, SqliteJournal};
