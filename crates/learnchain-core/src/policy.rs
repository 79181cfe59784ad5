//! Settlement policy: reward, reputation and validity constants.

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};
use crate::types::Amount;

/// Tunable constants applied when a session settles.
///
/// Ratings are in basis points (400 = 4.00 stars). Assessment scores are
/// percentages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementPolicy {
    /// Reward minted for a perfect assessment, in smallest units.
    pub base_reward: u64,
    /// Highest accepted assessment score.
    pub max_assessment_score: u32,
    /// Lowest accepted rating.
    pub min_rating: u32,
    /// Highest accepted rating.
    pub max_rating: u32,
    /// Score at or above which an assessment counts as passed.
    pub pass_threshold: u32,
    /// Rating points per reputation point.
    pub reputation_divisor: u32,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            base_reward: 1_000_000_000_000_000_000,
            max_assessment_score: 100,
            min_rating: 1,
            max_rating: 500,
            pass_threshold: 70,
            reputation_divisor: 100,
        }
    }
}

impl SettlementPolicy {
    /// Reward for an assessment score: `base_reward * score / max_score`, floored.
    pub fn reward_for(&self, score: u32) -> Amount {
        if self.max_assessment_score == 0 {
            return 0;
        }
        Amount::from(self.base_reward) * Amount::from(score)
            / Amount::from(self.max_assessment_score)
    }

    /// Reputation gained by an instructor for one rating, floored.
    pub fn reputation_delta(&self, rating: u32) -> u64 {
        if self.reputation_divisor == 0 {
            return 0;
        }
        u64::from(rating / self.reputation_divisor)
    }

    /// Whether a score passes the assessment.
    pub fn passed(&self, score: u32) -> bool {
        score >= self.pass_threshold
    }

    pub fn validate_rating(&self, rating: u32) -> Result<()> {
        if rating < self.min_rating || rating > self.max_rating {
            return Err(PlatformError::InvalidRating {
                rating,
                min: self.min_rating,
                max: self.max_rating,
            });
        }
        Ok(())
    }

    pub fn validate_score(&self, score: u32) -> Result<()> {
        if score > self.max_assessment_score {
            return Err(PlatformError::InvalidScore {
                score,
                max: self.max_assessment_score,
            });
        }
        Ok(())
    }
}
