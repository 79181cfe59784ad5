//! Achievement evaluation over user statistics.
//!
//! Achievements are not stored. They are recomputed from a user snapshot
//! every time they are asked for.

use serde::{Deserialize, Serialize};

use crate::registry::User;
use crate::types::Amount;

/// User statistic a rule compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    SkillsLearned,
    SkillsTaught,
    Reputation,
    SkillsCreated,
    TokensEarned,
}

impl Metric {
    /// Read this metric off a user.
    pub fn value(self, user: &User) -> Amount {
        match self {
            Metric::SkillsLearned => Amount::from(user.total_skills_learned),
            Metric::SkillsTaught => Amount::from(user.total_skills_taught),
            Metric::Reputation => Amount::from(user.reputation_score),
            Metric::SkillsCreated => user.skills_created.len() as Amount,
            Metric::TokensEarned => user.tokens_earned,
        }
    }
}

/// Unlocks `label` once `metric >= threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementRule {
    pub label: String,
    pub metric: Metric,
    pub threshold: u64,
}

impl AchievementRule {
    pub fn new(label: impl Into<String>, metric: Metric, threshold: u64) -> Self {
        Self {
            label: label.into(),
            metric,
            threshold,
        }
    }

    pub fn is_met(&self, user: &User) -> bool {
        self.metric.value(user) >= Amount::from(self.threshold)
    }
}

/// The built-in rule set.
pub fn default_rules() -> Vec<AchievementRule> {
    vec![
        AchievementRule::new("First Steps", Metric::SkillsLearned, 1),
        AchievementRule::new("Dedicated Learner", Metric::SkillsLearned, 10),
        AchievementRule::new("First Lesson", Metric::SkillsTaught, 1),
        AchievementRule::new("Master Instructor", Metric::SkillsTaught, 25),
        AchievementRule::new("Course Creator", Metric::SkillsCreated, 1),
        AchievementRule::new("Rising Star", Metric::Reputation, 100),
        AchievementRule::new("Legend", Metric::Reputation, 1000),
    ]
}

/// Labels of every rule the user satisfies, in rule order.
pub fn evaluate(user: &User, rules: &[AchievementRule]) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| rule.is_met(user))
        .map(|rule| rule.label.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::types::{Address, SkillId};

    fn fresh_user() -> User {
        let mut registry = Registry::new();
        registry
            .register_user(Address::from_bytes([1; 20]), "u", true, 0)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_new_user_has_nothing() {
        assert!(evaluate(&fresh_user(), &default_rules()).is_empty());
    }

    #[test]
    fn test_rule_order_is_preserved() {
        let mut user = fresh_user();
        user.total_skills_learned = 12;
        user.reputation_score = 150;
        user.skills_created.insert(SkillId(1));

        assert_eq!(
            evaluate(&user, &default_rules()),
            vec!["First Steps", "Dedicated Learner", "Course Creator", "Rising Star"]
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut user = fresh_user();
        user.total_skills_taught = 25;
        let labels = evaluate(&user, &default_rules());
        assert!(labels.contains(&"Master Instructor".to_string()));
    }

    #[test]
    fn test_custom_rules() {
        let mut user = fresh_user();
        user.tokens_earned = 500;
        let rules = vec![
            AchievementRule::new("Whale", Metric::TokensEarned, 1000),
            AchievementRule::new("Saver", Metric::TokensEarned, 500),
        ];
        assert_eq!(evaluate(&user, &rules), vec!["Saver"]);
    }

    #[test]
    fn test_deterministic() {
        let mut user = fresh_user();
        user.total_skills_learned = 1;
        let rules = default_rules();
        assert_eq!(evaluate(&user, &rules), evaluate(&user, &rules));
    }
}
