//! Proptest generators for property-based testing.
//!
//! Operations are generated over a small fixed cast of actors and small id
//! ranges so random sequences hit real sessions, collisions and failures
//! instead of only `NotFound` errors.

use proptest::prelude::*;

use learnchain_core::{Address, Amount, Command, SessionId, SkillDraft, SkillId};

/// Number of actors operations are drawn from.
pub const ACTORS: usize = 4;

/// Address of actor `index`.
pub fn actor(index: usize) -> Address {
    Address::derive(&format!("actor-{}", index))
}

/// Address allowed to mint in generated runs.
pub fn issuer() -> Address {
    Address::derive("generated-issuer")
}

/// Generate an actor index.
pub fn actor_index() -> impl Strategy<Value = usize> {
    0..ACTORS
}

/// Generate a skill price.
pub fn price() -> impl Strategy<Value = Amount> {
    1u128..=60
}

/// Generate an assessment score, occasionally out of range.
pub fn score() -> impl Strategy<Value = u32> {
    prop_oneof![8 => 0u32..=100, 1 => 101u32..=150]
}

/// Generate a rating, occasionally out of range.
pub fn rating() -> impl Strategy<Value = u32> {
    prop_oneof![8 => 1u32..=500, 1 => Just(0u32), 1 => 501u32..=600]
}

/// Generate a list of valid ratings.
pub fn ratings(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..=500, 1..=max_len)
}

/// One generated platform operation, in terms of actor indices.
#[derive(Debug, Clone)]
pub enum Op {
    Register { actor: usize, instructor: bool },
    CreateSkill { actor: usize, price: Amount },
    DeactivateSkill { actor: usize, skill: u64 },
    Mint { to: usize, amount: Amount },
    Transfer { from: usize, to: usize, amount: Amount },
    Start { actor: usize, skill: u64 },
    Complete { actor: usize, session: u64, score: u32, rating: u32 },
    Cancel { actor: usize, session: u64 },
}

impl Op {
    /// The command this operation submits.
    pub fn command(&self) -> Command {
        match *self {
            Op::Register { actor: a, instructor } => Command::RegisterUser {
                address: actor(a),
                username: format!("actor{}", a),
                is_instructor: instructor,
            },
            Op::CreateSkill { actor: a, price } => Command::CreateSkill {
                instructor: actor(a),
                draft: SkillDraft {
                    title: format!("Skill by actor {}", a),
                    description: String::new(),
                    category: if a % 2 == 0 { "Music" } else { "Code" }.to_string(),
                    duration: 30,
                    price,
                    content_hash: String::new(),
                },
            },
            Op::DeactivateSkill { actor: a, skill } => Command::DeactivateSkill {
                caller: actor(a),
                skill_id: SkillId(skill),
            },
            Op::Mint { to, amount } => Command::Mint {
                caller: issuer(),
                to: actor(to),
                amount,
            },
            Op::Transfer { from, to, amount } => Command::Transfer {
                from: actor(from),
                to: actor(to),
                amount,
            },
            Op::Start { actor: a, skill } => Command::StartSession {
                student: actor(a),
                skill_id: SkillId(skill),
            },
            Op::Complete {
                actor: a,
                session,
                score,
                rating,
            } => Command::CompleteSession {
                caller: actor(a),
                session_id: SessionId(session),
                assessment_score: score,
                rating,
                feedback: String::new(),
            },
            Op::Cancel { actor: a, session } => Command::CancelSession {
                caller: actor(a),
                session_id: SessionId(session),
            },
        }
    }
}

/// Generate a single operation, weighted towards the session lifecycle.
pub fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (actor_index(), any::<bool>())
            .prop_map(|(actor, instructor)| Op::Register { actor, instructor }),
        2 => (actor_index(), price()).prop_map(|(actor, price)| Op::CreateSkill { actor, price }),
        1 => (actor_index(), 1u64..=4).prop_map(|(actor, skill)| Op::DeactivateSkill { actor, skill }),
        2 => (actor_index(), 0u128..=200).prop_map(|(to, amount)| Op::Mint { to, amount }),
        1 => (actor_index(), actor_index(), 0u128..=80)
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        4 => (actor_index(), 1u64..=4).prop_map(|(actor, skill)| Op::Start { actor, skill }),
        4 => (actor_index(), 1u64..=8, score(), rating()).prop_map(
            |(actor, session, score, rating)| Op::Complete {
                actor,
                session,
                score,
                rating
            }
        ),
        2 => (actor_index(), 1u64..=8).prop_map(|(actor, session)| Op::Cancel { actor, session }),
    ]
}

/// Generate a sequence of up to `max_len` operations.
pub fn ops(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op(), 1..=max_len)
}
