//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use learnchain::{EngineConfig, ManualClock, Platform};
use learnchain_core::{Address, Amount, SessionEngine, SettlementPolicy, SkillDraft, SkillId, Timestamp};
use learnchain_store::MemoryJournal;

/// Time every fixture clock starts at.
pub const FIXTURE_START: Timestamp = 1_700_000_000;

/// Reward for a perfect score in fixtures; small so amounts stay readable.
pub const FIXTURE_BASE_REWARD: u64 = 1_000;

/// Settlement policy used by fixtures.
pub fn fixture_policy() -> SettlementPolicy {
    SettlementPolicy {
        base_reward: FIXTURE_BASE_REWARD,
        ..Default::default()
    }
}

/// Engine config used by fixtures.
pub fn fixture_config() -> EngineConfig {
    EngineConfig {
        policy: fixture_policy(),
        ..Default::default()
    }
}

/// A skill listing with the given price.
pub fn skill_draft(title: &str, category: &str, price: Amount) -> SkillDraft {
    SkillDraft {
        title: title.to_string(),
        description: format!("Learn {}", title),
        category: category.to_string(),
        duration: 60,
        price,
        content_hash: String::new(),
    }
}

/// Whether balances plus escrow account for the whole supply.
pub fn is_conserved(engine: &SessionEngine) -> bool {
    let ledger = engine.ledger();
    ledger
        .total_balances()
        .checked_add(engine.total_escrowed())
        .map_or(false, |held| held == ledger.total_supply())
}

/// A platform over an in-memory journal with a manual clock.
pub struct TestFixture {
    pub platform: Platform<MemoryJournal, Arc<ManualClock>>,
    pub clock: Arc<ManualClock>,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(fixture_config()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let clock = Arc::new(ManualClock::new(FIXTURE_START));
        let platform = Platform::open(config, MemoryJournal::new(), clock.clone())
            .await
            .expect("fixture config is valid");
        Self { platform, clock }
    }

    pub fn issuer(&self) -> Address {
        self.platform.config().issuer
    }

    /// Register an instructor named `name`.
    pub async fn instructor(&self, name: &str) -> Address {
        let address = Address::derive(name);
        self.platform
            .register_user(address, name, true)
            .await
            .expect("register instructor");
        address
    }

    /// Register a student named `name` and mint `funds` to them.
    pub async fn student(&self, name: &str, funds: Amount) -> Address {
        let address = Address::derive(name);
        self.platform
            .register_user(address, name, false)
            .await
            .expect("register student");
        if funds > 0 {
            self.platform
                .mint(self.issuer(), address, funds)
                .await
                .expect("fund student");
        }
        address
    }

    /// List a skill for `instructor` at `price`.
    pub async fn skill(&self, instructor: Address, price: Amount) -> SkillId {
        self.platform
            .create_skill(instructor, skill_draft("Guitar", "Music", price))
            .await
            .expect("create skill")
    }

    /// Panic unless balances plus escrow equal the supply.
    pub async fn assert_conserved(&self) {
        assert!(
            self.platform.read(is_conserved).await,
            "balances plus escrow no longer equal total supply"
        );
    }
}

/// An engine with `count` registered instructors and students.
///
/// Instructors are `instructor-{i}`, students `student-{i}` holding
/// `funds` each.
pub fn engine_with_parties(count: usize, funds: Amount) -> (SessionEngine, Vec<Address>, Vec<Address>) {
    let issuer = Address::derive("issuer");
    let mut engine = SessionEngine::new(issuer, fixture_policy());
    let mut instructors = Vec::with_capacity(count);
    let mut students = Vec::with_capacity(count);

    for i in 0..count {
        let instructor = Address::derive(&format!("instructor-{}", i));
        engine
            .register_user(instructor, &format!("instructor{}", i), true, FIXTURE_START)
            .expect("register instructor");
        instructors.push(instructor);

        let student = Address::derive(&format!("student-{}", i));
        engine
            .register_user(student, &format!("student{}", i), false, FIXTURE_START)
            .expect("register student");
        if funds > 0 {
            engine
                .mint(issuer, student, funds)
                .expect("fund student");
        }
        students.push(student);
    }
    (engine, instructors, students)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_setup() {
        let fixture = TestFixture::new().await;
        let teacher = fixture.instructor("teacher").await;
        let student = fixture.student("student", 500).await;
        let skill = fixture.skill(teacher, 100).await;

        assert_eq!(fixture.platform.balance_of(&student).await, 500);
        assert_eq!(fixture.platform.skill(skill).await.unwrap().price, 100);
        fixture.assert_conserved().await;
    }

    #[test]
    fn test_engine_with_parties() {
        let (engine, instructors, students) = engine_with_parties(3, 50);
        assert_eq!(instructors.len(), 3);
        assert_eq!(engine.registry().user_count(), 6);
        assert_eq!(engine.balance_of(&students[2]), 50);
        assert!(is_conserved(&engine));
    }
}
