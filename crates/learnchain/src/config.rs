//! Engine configuration with TOML file support.

use std::path::Path;

use serde::{Deserialize, Serialize};

use learnchain_core::{default_rules, Address, AchievementRule, SettlementPolicy, TokenInfo};

use crate::error::{EngineError, Result};
use crate::logging::LogFormat;

/// Label the default issuer address is derived from.
pub const DEFAULT_ISSUER_LABEL: &str = "learnchain-platform";

/// Default event bus buffer, in records.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Configuration for a [`Platform`](crate::Platform).
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every section is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The only account allowed to mint. Session rewards are minted by it.
    pub issuer: Address,

    /// Token metadata used when rendering amounts.
    pub token: TokenInfo,

    /// Reward, rating and reputation constants.
    pub policy: SettlementPolicy,

    /// Achievement rules, evaluated in order.
    pub achievements: Vec<AchievementRule>,

    pub events: EventsConfig,

    pub log: LogConfig,
}

/// Event bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Records buffered per subscriber before slow subscribers lag.
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter directive, e.g. `"info"` or `"debug,learnchain=trace"`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Human,
            level: "info".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            issuer: Address::derive(DEFAULT_ISSUER_LABEL),
            token: TokenInfo::default(),
            policy: SettlementPolicy::default(),
            achievements: default_rules(),
            events: EventsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let policy = &self.policy;
        if policy.min_rating > policy.max_rating {
            return Err(EngineError::Config(format!(
                "policy.min_rating {} exceeds policy.max_rating {}",
                policy.min_rating, policy.max_rating
            )));
        }
        if policy.max_assessment_score == 0 {
            return Err(EngineError::Config(
                "policy.max_assessment_score must be positive".into(),
            ));
        }
        if policy.pass_threshold > policy.max_assessment_score {
            return Err(EngineError::Config(format!(
                "policy.pass_threshold {} exceeds policy.max_assessment_score {}",
                policy.pass_threshold, policy.max_assessment_score
            )));
        }
        if policy.reputation_divisor == 0 {
            return Err(EngineError::Config(
                "policy.reputation_divisor must be positive".into(),
            ));
        }
        if self.events.capacity == 0 {
            return Err(EngineError::Config("events.capacity must be positive".into()));
        }
        if let Some(rule) = self.achievements.iter().find(|r| r.label.trim().is_empty()) {
            return Err(EngineError::Config(format!(
                "achievement rule on {:?} has an empty label",
                rule.metric
            )));
        }
        Ok(())
    }
}
