//! SessionEngine: the platform state machine.
//!
//! The engine owns the ledger, registry and session book, and is the only
//! writer of registry statistics and of escrow. Every operation validates
//! all of its preconditions before the first mutation, so a failed call
//! leaves the engine untouched. A successful call returns its output
//! together with the single [`Event`] describing it.
//!
//! The engine is synchronous and time-agnostic: the caller passes `now`.

use crate::error::{PlatformError, Result};
use crate::event::{Command, Event};
use crate::ledger::Ledger;
use crate::policy::SettlementPolicy;
use crate::registry::{CompletionStats, Registry, Skill, SkillDraft, User};
use crate::session::{Session, SessionBook, SessionState};
use crate::types::{Address, Amount, SessionId, SkillId, Timestamp};
use crate::validation::validate_feedback;

/// Output of a committed operation plus the event it emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<T> {
    pub output: T,
    pub event: Event,
}

impl<T> Applied<T> {
    fn new(output: T, event: Event) -> Self {
        Self { output, event }
    }
}

/// Result of settling a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub session_id: SessionId,
    /// Escrow released to the instructor.
    pub paid: Amount,
    /// Reward minted to the student.
    pub reward: Amount,
    pub reputation_delta: u64,
    pub passed: bool,
}

/// Owner of all platform state.
#[derive(Debug, Clone)]
pub struct SessionEngine {
    ledger: Ledger,
    registry: Registry,
    sessions: SessionBook,
    policy: SettlementPolicy,
}

impl SessionEngine {
    /// Create an empty engine. `issuer` is the only account allowed to mint,
    /// and the account session rewards are minted under.
    pub fn new(issuer: Address, policy: SettlementPolicy) -> Self {
        Self {
            ledger: Ledger::new(issuer),
            registry: Registry::new(),
            sessions: SessionBook::new(),
            policy,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionBook {
        &self.sessions
    }

    pub fn policy(&self) -> &SettlementPolicy {
        &self.policy
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.ledger.balance_of(account)
    }

    pub fn user(&self, address: &Address) -> Option<&User> {
        self.registry.user(address)
    }

    pub fn skill(&self, id: SkillId) -> Option<&Skill> {
        self.registry.skill(id)
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Sessions where `address` is student or instructor, in id order.
    pub fn user_sessions(&self, address: &Address) -> Vec<&Session> {
        self.sessions.for_user(address)
    }

    /// Funds currently held by active sessions.
    pub fn total_escrowed(&self) -> Amount {
        self.sessions.total_escrowed()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registry operations
    // ─────────────────────────────────────────────────────────────────────────

    pub fn register_user(
        &mut self,
        address: Address,
        username: &str,
        is_instructor: bool,
        now: Timestamp,
    ) -> Result<Applied<()>> {
        self.registry
            .register_user(address, username, is_instructor, now)?;
        Ok(Applied::new(
            (),
            Event::UserRegistered {
                address,
                username: username.to_string(),
                is_instructor,
            },
        ))
    }

    pub fn create_skill(
        &mut self,
        instructor: Address,
        draft: SkillDraft,
        now: Timestamp,
    ) -> Result<Applied<SkillId>> {
        let skill_id = self.registry.create_skill(instructor, draft.clone(), now)?;
        Ok(Applied::new(
            skill_id,
            Event::SkillCreated {
                skill_id,
                instructor,
                draft,
            },
        ))
    }

    pub fn deactivate_skill(&mut self, caller: Address, skill_id: SkillId) -> Result<Applied<()>> {
        self.registry.deactivate_skill(&caller, skill_id)?;
        Ok(Applied::new(
            (),
            Event::SkillDeactivated {
                skill_id,
                instructor: caller,
            },
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Enroll `student` in a skill, moving its price into escrow.
    pub fn start_session(
        &mut self,
        student: Address,
        skill_id: SkillId,
        now: Timestamp,
    ) -> Result<Applied<SessionId>> {
        self.registry.require_user(&student)?;
        let skill = self.registry.require_skill(skill_id)?;
        if !skill.is_active {
            return Err(PlatformError::SkillInactive(skill_id));
        }
        if skill.instructor == student {
            return Err(PlatformError::SelfEnrollment { skill_id, student });
        }
        let (instructor, price) = (skill.instructor, skill.price);
        self.ledger.ensure_funds(&student, price)?;

        self.ledger.debit(&student, price)?;
        let session_id = self
            .sessions
            .open(skill_id, student, instructor, price, now);
        self.registry.record_enrollment(&student, skill_id);

        Ok(Applied::new(
            session_id,
            Event::SessionStarted {
                session_id,
                skill_id,
                student,
                instructor,
                price,
            },
        ))
    }

    /// Settle an active session: pay the instructor, reward the student and
    /// fold the rating into the skill and instructor statistics.
    ///
    /// Only the session's student may complete it.
    pub fn complete_session(
        &mut self,
        caller: Address,
        session_id: SessionId,
        assessment_score: u32,
        rating: u32,
        feedback: &str,
        now: Timestamp,
    ) -> Result<Applied<Settlement>> {
        let session = self.sessions.require(session_id)?;
        session.ensure_active()?;
        if session.student != caller {
            return Err(PlatformError::Unauthorized {
                caller,
                action: "complete session",
            });
        }
        self.policy.validate_rating(rating)?;
        self.policy.validate_score(assessment_score)?;
        validate_feedback(feedback)?;

        let (skill_id, student, instructor, escrow) = (
            session.skill_id,
            session.student,
            session.instructor,
            session.escrow,
        );
        let reward = self.policy.reward_for(assessment_score);
        let reputation_delta = self.policy.reputation_delta(rating);
        let passed = self.policy.passed(assessment_score);

        self.ledger.ensure_credit_fits(&instructor, escrow)?;
        if reward > 0 {
            self.ledger.ensure_mint_fits(&student, reward)?;
        }

        self.ledger.credit(&instructor, escrow)?;
        if reward > 0 {
            let issuer = self.ledger.issuer();
            self.ledger.mint(&issuer, &student, reward)?;
        }
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.state = SessionState::Completed;
            session.ended_at = Some(now);
            session.escrow = 0;
            session.assessment_score = Some(assessment_score);
            session.rating = Some(rating);
            session.feedback = Some(feedback.to_string());
            session.reward = reward;
        }
        self.registry.record_completion(&CompletionStats {
            skill_id,
            student,
            instructor,
            rating,
            price: escrow,
            reward,
            reputation_delta,
        });

        Ok(Applied::new(
            Settlement {
                session_id,
                paid: escrow,
                reward,
                reputation_delta,
                passed,
            },
            Event::SessionCompleted {
                session_id,
                skill_id,
                student,
                instructor,
                assessment_score,
                passed,
                rating,
                feedback: feedback.to_string(),
                price: escrow,
                reward,
                reputation_delta,
            },
        ))
    }

    /// Cancel an active session and refund its escrow to the student.
    ///
    /// Either party may cancel. No statistics change.
    pub fn cancel_session(
        &mut self,
        session_id: SessionId,
        by: Address,
        now: Timestamp,
    ) -> Result<Applied<Amount>> {
        let session = self.sessions.require(session_id)?;
        session.ensure_active()?;
        if !session.involves(&by) {
            return Err(PlatformError::Unauthorized {
                caller: by,
                action: "cancel session",
            });
        }
        let (skill_id, student, instructor, refund) = (
            session.skill_id,
            session.student,
            session.instructor,
            session.escrow,
        );
        self.ledger.ensure_credit_fits(&student, refund)?;

        self.ledger.credit(&student, refund)?;
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.state = SessionState::Cancelled;
            session.ended_at = Some(now);
            session.escrow = 0;
        }

        Ok(Applied::new(
            refund,
            Event::SessionCancelled {
                session_id,
                skill_id,
                cancelled_by: by,
                student,
                instructor,
                refund,
            },
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Token operations
    // ─────────────────────────────────────────────────────────────────────────

    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<Applied<()>> {
        self.ledger.transfer(&from, &to, amount)?;
        Ok(Applied::new((), Event::Transfer { from, to, amount }))
    }

    pub fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> Result<Applied<()>> {
        self.ledger.mint(&caller, &to, amount)?;
        Ok(Applied::new(
            (),
            Event::Minted {
                issuer: caller,
                to,
                amount,
            },
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Execute a command and return its event.
    pub fn execute(&mut self, command: Command, now: Timestamp) -> Result<Event> {
        let event = match command {
            Command::RegisterUser {
                address,
                username,
                is_instructor,
            } => self.register_user(address, &username, is_instructor, now)?.event,
            Command::CreateSkill { instructor, draft } => {
                self.create_skill(instructor, draft, now)?.event
            }
            Command::DeactivateSkill { caller, skill_id } => {
                self.deactivate_skill(caller, skill_id)?.event
            }
            Command::StartSession { student, skill_id } => {
                self.start_session(student, skill_id, now)?.event
            }
            Command::CompleteSession {
                caller,
                session_id,
                assessment_score,
                rating,
                feedback,
            } => {
                self.complete_session(caller, session_id, assessment_score, rating, &feedback, now)?
                    .event
            }
            Command::CancelSession { caller, session_id } => {
                self.cancel_session(session_id, caller, now)?.event
            }
            Command::Transfer { from, to, amount } => self.transfer(from, to, amount)?.event,
            Command::Mint { caller, to, amount } => self.mint(caller, to, amount)?.event,
        };
        Ok(event)
    }
}
