//! # Learnchain Testkit
//!
//! Testing utilities for Learnchain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a [`Platform`](learnchain::Platform) over an in-memory
//!   journal and a manual clock, plus helpers to register and fund parties
//! - **Generators**: Proptest strategies for random operation sequences
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use learnchain_core::SessionEngine;
//! use learnchain_testkit::{generators::{issuer, ops}, fixtures::{fixture_policy, is_conserved}};
//!
//! proptest! {
//!     #[test]
//!     fn supply_is_conserved(ops in ops(64)) {
//!         let mut engine = SessionEngine::new(issuer(), fixture_policy());
//!         for op in &ops {
//!             let _ = engine.execute(op.command(), 0);
//!             prop_assert!(is_conserved(&engine));
//!         }
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use learnchain_testkit::TestFixture;
//!
//! let fixture = TestFixture::new().await;
//! let teacher = fixture.instructor("teacher").await;
//! let student = fixture.student("student", 500).await;
//! let skill = fixture.skill(teacher, 100).await;
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    engine_with_parties, fixture_config, fixture_policy, is_conserved, skill_draft, TestFixture,
};
pub use generators::{actor, issuer, op, ops, Op};
