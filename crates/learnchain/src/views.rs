//! Response views for external callers.
//!
//! Views flatten engine records into the JSON shapes API consumers expect:
//! camelCase fields, ratings as decimals, token amounts rendered with the
//! token's decimals.

use serde::Serialize;

use learnchain_core::{Amount, Session, Skill, TokenInfo, User};

/// Basis points to a decimal (400 -> 4.0).
fn from_basis_points(value: u32) -> f64 {
    f64::from(value) / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillView {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub duration: u64,
    /// Price in whole tokens, e.g. `"1.5"`.
    pub price: String,
    /// Price in smallest units.
    pub price_raw: String,
    pub instructor: String,
    pub is_active: bool,
    pub total_students: u64,
    pub average_rating: f64,
    pub total_ratings: u64,
    pub content_hash: String,
    pub created_at: i64,
}

impl SkillView {
    pub fn new(skill: &Skill, token: &TokenInfo) -> Self {
        Self {
            id: skill.id.0,
            title: skill.title.clone(),
            description: skill.description.clone(),
            category: skill.category.clone(),
            duration: skill.duration,
            price: token.format(skill.price),
            price_raw: skill.price.to_string(),
            instructor: skill.instructor.to_hex(),
            is_active: skill.is_active,
            total_students: skill.total_students,
            average_rating: from_basis_points(skill.average_rating),
            total_ratings: skill.total_ratings,
            content_hash: skill.content_hash.clone(),
            created_at: skill.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileView {
    pub address: String,
    pub username: String,
    pub is_instructor: bool,
    pub total_skills_taught: u64,
    pub total_skills_learned: u64,
    pub reputation_score: u64,
    pub tokens_earned: String,
    pub tokens_spent: String,
    pub balance: String,
    pub skills_owned: Vec<u64>,
    pub skills_created: Vec<u64>,
    pub registered_at: i64,
    pub achievements: Vec<String>,
}

impl UserProfileView {
    pub fn new(user: &User, balance: Amount, achievements: Vec<String>, token: &TokenInfo) -> Self {
        Self {
            address: user.address.to_hex(),
            username: user.username.clone(),
            is_instructor: user.is_instructor,
            total_skills_taught: user.total_skills_taught,
            total_skills_learned: user.total_skills_learned,
            reputation_score: user.reputation_score,
            tokens_earned: token.format(user.tokens_earned),
            tokens_spent: token.format(user.tokens_spent),
            balance: token.format(balance),
            skills_owned: user.skills_owned.iter().map(|id| id.0).collect(),
            skills_created: user.skills_created.iter().map(|id| id.0).collect(),
            registered_at: user.registered_at,
            achievements,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: u64,
    pub skill_id: u64,
    pub student: String,
    pub instructor: String,
    pub state: &'static str,
    pub started_at: i64,
    pub ended_at: Option<i64>,
    pub price: String,
    pub escrowed: String,
    pub assessment_score: Option<u32>,
    pub rating: Option<f64>,
    pub feedback: Option<String>,
    pub reward: String,
}

impl SessionView {
    pub fn new(session: &Session, token: &TokenInfo) -> Self {
        Self {
            id: session.id.0,
            skill_id: session.skill_id.0,
            student: session.student.to_hex(),
            instructor: session.instructor.to_hex(),
            state: session.state.as_str(),
            started_at: session.started_at,
            ended_at: session.ended_at,
            price: token.format(session.price),
            escrowed: token.format(session.escrow),
            assessment_score: session.assessment_score,
            rating: session.rating.map(from_basis_points),
            feedback: session.feedback.clone(),
            reward: token.format(session.reward),
        }
    }
}
