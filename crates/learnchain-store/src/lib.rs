//! # Learnchain Store
//!
//! Event journal persistence for Learnchain. Provides a trait-based
//! interface for the append-only event journal with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`JournalStore`] - The async trait for all journal operations
//! - [`SqliteJournal`] - SQLite-based persistent journal
//! - [`MemoryJournal`] - In-memory journal for tests
//! - [`AppendResult`] - Result of appending a record
//!
//! ## Usage
//!
//! ```rust,no_run
//! use learnchain_store::{JournalStore, SqliteJournal};
//!
//! async fn example() {
//!     let journal = SqliteJournal::open("journal.db").unwrap();
//!     let records = journal.read_all().await.unwrap();
//!     println!("{} records", records.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent appends**: Appending the same record twice returns `AlreadyExists`
//! - **Conflict detection**: A different record at an occupied seq returns `Conflict`
//! - **Participant index**: Records can be listed per address

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryJournal;
pub use sqlite::SqliteJournal;
pub use traits::{AppendResult, JournalHead, JournalStore};
