//! Registry: user profiles and skill listings.
//!
//! The registry owns identity fields (username, instructor address) and
//! assigns skill ids. Statistics fields are only written by the session
//! engine through the crate-private `record_*` methods.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};
use crate::types::{Address, Amount, SkillId, Timestamp};
use crate::validation::{validate_skill_draft, validate_username};

/// A registered participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub address: Address,
    pub username: String,
    pub is_instructor: bool,
    pub total_skills_taught: u64,
    pub total_skills_learned: u64,
    pub reputation_score: u64,
    pub tokens_earned: Amount,
    pub tokens_spent: Amount,
    pub skills_owned: BTreeSet<SkillId>,
    pub skills_created: BTreeSet<SkillId>,
    pub registered_at: Timestamp,
}

impl User {
    fn new(address: Address, username: String, is_instructor: bool, now: Timestamp) -> Self {
        Self {
            address,
            username,
            is_instructor,
            total_skills_taught: 0,
            total_skills_learned: 0,
            reputation_score: 0,
            tokens_earned: 0,
            tokens_spent: 0,
            skills_owned: BTreeSet::new(),
            skills_created: BTreeSet::new(),
            registered_at: now,
        }
    }
}

/// Caller-supplied fields of a new skill listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    /// Expected duration in minutes.
    pub duration: u64,
    pub price: Amount,
    /// Opaque pointer to off-engine content (e.g. an IPFS CID).
    pub content_hash: String,
}

/// A published skill listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skill {
    pub id: SkillId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub duration: u64,
    pub price: Amount,
    pub instructor: Address,
    pub is_active: bool,
    pub total_students: u64,
    /// Mean rating in basis points, floored.
    pub average_rating: u32,
    pub total_ratings: u64,
    pub content_hash: String,
    pub created_at: Timestamp,
    rating_points: u64,
}

impl Skill {
    /// Fold one rating into the running mean.
    ///
    /// The mean is kept as `floor(sum / count)` over the exact sum, which is
    /// the weighted running mean without accumulated rounding error.
    fn add_rating(&mut self, rating: u32) {
        self.rating_points = self.rating_points.saturating_add(u64::from(rating));
        self.total_ratings = self.total_ratings.saturating_add(1);
        self.average_rating = (self.rating_points / self.total_ratings) as u32;
    }
}

/// Filter for skill listings. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillQuery {
    /// Exact, case-sensitive category.
    pub category: Option<String>,
    pub instructor: Option<Address>,
    /// Case-insensitive substring of title, description or category.
    pub text: Option<String>,
    /// Include deactivated listings.
    pub include_inactive: bool,
}

impl SkillQuery {
    fn matches(&self, skill: &Skill) -> bool {
        if !self.include_inactive && !skill.is_active {
            return false;
        }
        if let Some(category) = &self.category {
            if &skill.category != category {
                return false;
            }
        }
        if let Some(instructor) = &self.instructor {
            if &skill.instructor != instructor {
                return false;
            }
        }
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            let hit = skill.title.to_lowercase().contains(&needle)
                || skill.description.to_lowercase().contains(&needle)
                || skill.category.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Ranking criterion for the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardKind {
    Reputation,
    Earnings,
    SkillsTaught,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub address: Address,
    pub username: String,
    pub score: Amount,
}

/// Owner of all user and skill records.
#[derive(Debug, Clone)]
pub struct Registry {
    users: HashMap<Address, User>,
    usernames: HashMap<String, Address>,
    skills: BTreeMap<SkillId, Skill>,
    categories: HashMap<String, Vec<SkillId>>,
    next_skill_id: SkillId,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            usernames: HashMap::new(),
            skills: BTreeMap::new(),
            categories: HashMap::new(),
            next_skill_id: SkillId::FIRST,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new user. Registration is one-time per address.
    pub fn register_user(
        &mut self,
        address: Address,
        username: &str,
        is_instructor: bool,
        now: Timestamp,
    ) -> Result<&User> {
        if self.users.contains_key(&address) {
            return Err(PlatformError::AlreadyRegistered(address));
        }
        validate_username(username)?;
        if self.usernames.contains_key(username) {
            return Err(PlatformError::UsernameTaken(username.to_string()));
        }

        self.usernames.insert(username.to_string(), address);
        let user = self
            .users
            .entry(address)
            .or_insert_with(|| User::new(address, username.to_string(), is_instructor, now));
        Ok(user)
    }

    pub fn user(&self, address: &Address) -> Option<&User> {
        self.users.get(address)
    }

    /// Fetch a user or fail with `NotRegistered`.
    pub fn require_user(&self, address: &Address) -> Result<&User> {
        self.users
            .get(address)
            .ok_or(PlatformError::NotRegistered(*address))
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.users.contains_key(address)
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.usernames
            .get(username)
            .and_then(|address| self.users.get(address))
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Rank users by a statistic, highest first. Ties break by address.
    pub fn leaderboard(&self, kind: LeaderboardKind, limit: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .users
            .values()
            .map(|user| LeaderboardEntry {
                address: user.address,
                username: user.username.clone(),
                score: match kind {
                    LeaderboardKind::Reputation => Amount::from(user.reputation_score),
                    LeaderboardKind::Earnings => user.tokens_earned,
                    LeaderboardKind::SkillsTaught => Amount::from(user.total_skills_taught),
                },
            })
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.address.cmp(&b.address)));
        entries.truncate(limit);
        entries
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Skills
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish a new skill listing for a registered instructor.
    pub fn create_skill(
        &mut self,
        instructor: Address,
        draft: SkillDraft,
        now: Timestamp,
    ) -> Result<SkillId> {
        let user = self.require_user(&instructor)?;
        if !user.is_instructor {
            return Err(PlatformError::NotInstructor(instructor));
        }
        if draft.price == 0 {
            return Err(PlatformError::InvalidPrice(draft.price));
        }
        validate_skill_draft(&draft)?;

        let id = self.next_skill_id;
        self.next_skill_id = id.next();

        self.categories
            .entry(draft.category.clone())
            .or_default()
            .push(id);
        if let Some(user) = self.users.get_mut(&instructor) {
            user.skills_created.insert(id);
        }
        self.skills.insert(
            id,
            Skill {
                id,
                title: draft.title,
                description: draft.description,
                category: draft.category,
                duration: draft.duration,
                price: draft.price,
                instructor,
                is_active: true,
                total_students: 0,
                average_rating: 0,
                total_ratings: 0,
                content_hash: draft.content_hash,
                created_at: now,
                rating_points: 0,
            },
        );
        Ok(id)
    }

    /// Withdraw a listing from enrollment. Only its instructor may do this.
    ///
    /// Sessions already running on the skill are unaffected.
    pub fn deactivate_skill(&mut self, caller: &Address, id: SkillId) -> Result<()> {
        let skill = self.require_skill(id)?;
        if skill.instructor != *caller {
            return Err(PlatformError::Unauthorized {
                caller: *caller,
                action: "deactivate skill",
            });
        }
        if !skill.is_active {
            return Err(PlatformError::SkillInactive(id));
        }
        if let Some(skill) = self.skills.get_mut(&id) {
            skill.is_active = false;
        }
        Ok(())
    }

    pub fn skill(&self, id: SkillId) -> Option<&Skill> {
        self.skills.get(&id)
    }

    /// Fetch a skill or fail with `SkillNotFound`.
    pub fn require_skill(&self, id: SkillId) -> Result<&Skill> {
        self.skills.get(&id).ok_or(PlatformError::SkillNotFound(id))
    }

    /// Ids in `category`, in creation order. Exact, case-sensitive match.
    pub fn skills_by_category(&self, category: &str) -> Vec<SkillId> {
        self.categories.get(category).cloned().unwrap_or_default()
    }

    /// Number of skills ever created, active or not.
    pub fn total_skills(&self) -> u64 {
        self.skills.len() as u64
    }

    /// Active skills in id order.
    pub fn active_skills(&self) -> Vec<&Skill> {
        self.skills.values().filter(|s| s.is_active).collect()
    }

    /// Skills created by an instructor, in id order.
    pub fn skills_by_instructor(&self, instructor: &Address) -> Vec<&Skill> {
        self.skills
            .values()
            .filter(|s| &s.instructor == instructor)
            .collect()
    }

    /// Skills matching every set field of the query, in id order.
    pub fn search(&self, query: &SkillQuery) -> Vec<&Skill> {
        self.skills.values().filter(|s| query.matches(s)).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statistics (session engine only)
    // ─────────────────────────────────────────────────────────────────────────

    /// Note that `student` holds a seat in `skill_id`.
    pub(crate) fn record_enrollment(&mut self, student: &Address, skill_id: SkillId) {
        if let Some(user) = self.users.get_mut(student) {
            user.skills_owned.insert(skill_id);
        }
    }

    /// Apply the statistics of one completed session.
    pub(crate) fn record_completion(&mut self, completion: &CompletionStats) {
        if let Some(skill) = self.skills.get_mut(&completion.skill_id) {
            skill.total_students = skill.total_students.saturating_add(1);
            skill.add_rating(completion.rating);
        }
        if let Some(student) = self.users.get_mut(&completion.student) {
            student.total_skills_learned = student.total_skills_learned.saturating_add(1);
            student.tokens_spent = student.tokens_spent.saturating_add(completion.price);
            student.tokens_earned = student.tokens_earned.saturating_add(completion.reward);
        }
        if let Some(instructor) = self.users.get_mut(&completion.instructor) {
            instructor.total_skills_taught = instructor.total_skills_taught.saturating_add(1);
            instructor.tokens_earned = instructor.tokens_earned.saturating_add(completion.price);
            instructor.reputation_score = instructor
                .reputation_score
                .saturating_add(completion.reputation_delta);
        }
    }
}

/// Statistics delta of one completed session.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CompletionStats {
    pub skill_id: SkillId,
    pub student: Address,
    pub instructor: Address,
    pub rating: u32,
    pub price: Amount,
    pub reward: Amount,
    pub reputation_delta: u64,
}
