//! Input validation for caller-supplied text fields.

use crate::error::{PlatformError, Result};
use crate::registry::SkillDraft;

/// Maximum username length in bytes.
pub const MAX_USERNAME_LEN: usize = 64;

/// Maximum skill title length in bytes.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum category length in bytes.
pub const MAX_CATEGORY_LEN: usize = 64;

/// Maximum description length in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 10_000;

/// Maximum content pointer length in bytes.
pub const MAX_CONTENT_HASH_LEN: usize = 256;

/// Maximum session feedback length in bytes.
pub const MAX_FEEDBACK_LEN: usize = 2_000;

fn invalid(field: &'static str, reason: impl Into<String>) -> PlatformError {
    PlatformError::InvalidField {
        field,
        reason: reason.into(),
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(invalid(
            field,
            format!("length {} exceeds maximum {}", value.len(), max),
        ));
    }
    Ok(())
}

fn check_required(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    check_len(field, value, max)
}

/// Validate a username. Usernames are compared byte-for-byte, so no
/// normalization happens here.
pub fn validate_username(username: &str) -> Result<()> {
    check_required("username", username, MAX_USERNAME_LEN)
}

/// Validate the text fields of a skill listing.
///
/// Price is checked separately by the registry since it has its own error kind.
pub fn validate_skill_draft(draft: &SkillDraft) -> Result<()> {
    check_required("title", &draft.title, MAX_TITLE_LEN)?;
    check_required("category", &draft.category, MAX_CATEGORY_LEN)?;
    check_len("description", &draft.description, MAX_DESCRIPTION_LEN)?;
    check_len("content_hash", &draft.content_hash, MAX_CONTENT_HASH_LEN)?;
    Ok(())
}

/// Validate free-text session feedback.
pub fn validate_feedback(feedback: &str) -> Result<()> {
    check_len("feedback", feedback, MAX_FEEDBACK_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> SkillDraft {
        SkillDraft {
            title: "Rust ownership".into(),
            description: "Borrowing without tears".into(),
            category: "Programming".into(),
            duration: 60,
            price: 100,
            content_hash: "QmHash".into(),
        }
    }

    #[test]
    fn test_valid_username() {
        assert!(validate_username("alice").is_ok());
    }

    #[test]
    fn test_empty_username() {
        let err = validate_username("   ").unwrap_err();
        assert_eq!(err.field(), Some("username"));
    }

    #[test]
    fn test_long_username() {
        let name = "x".repeat(MAX_USERNAME_LEN + 1);
        assert!(matches!(
            validate_username(&name),
            Err(PlatformError::InvalidField { field: "username", .. })
        ));
    }

    #[test]
    fn test_valid_draft() {
        assert!(validate_skill_draft(&draft()).is_ok());
    }

    #[test]
    fn test_draft_missing_title() {
        let mut d = draft();
        d.title = String::new();
        assert!(matches!(
            validate_skill_draft(&d),
            Err(PlatformError::InvalidField { field: "title", .. })
        ));
    }

    #[test]
    fn test_draft_missing_category() {
        let mut d = draft();
        d.category = " ".into();
        assert!(matches!(
            validate_skill_draft(&d),
            Err(PlatformError::InvalidField { field: "category", .. })
        ));
    }

    #[test]
    fn test_empty_content_hash_allowed() {
        let mut d = draft();
        d.content_hash = String::new();
        assert!(validate_skill_draft(&d).is_ok());
    }

    #[test]
    fn test_feedback_limit() {
        assert!(validate_feedback("").is_ok());
        assert!(validate_feedback(&"f".repeat(MAX_FEEDBACK_LEN + 1)).is_err());
    }
}
