//! Moderation Ledgers
//!
//! Time-bounded mutes and bans, ordered warnings and the global denylist.
//! Expired records are never reported as active and are removed the next
//! time they are read.

pub mod denylist;
pub mod error;
pub mod restrictions;
pub mod warnings;

pub use denylist::Denylist;
pub use error::ModerationError;
pub use restrictions::{RestrictionLedger, RestrictionStatus};
pub use warnings::WarningLedger;

use chrono::{DateTime, Utc};

/// Longest accepted reason, in characters.
pub const MAX_REASON_CHARS: usize = 500;

/// Reason stored when none is given.
pub const DEFAULT_REASON: &str = "Not specified";

/// Trim a free-text reason, substituting [`DEFAULT_REASON`] when blank.
pub(crate) fn normalize_reason(reason: Option<&str>) -> Result<String, ModerationError> {
    let trimmed = reason.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(DEFAULT_REASON.to_string());
    }
    if trimmed.chars().count() > MAX_REASON_CHARS {
        return Err(ModerationError::InvalidReason(format!(
            "reason must be at most {MAX_REASON_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Reject expiries that are not in the future. `None` (permanent) passes.
///
/// Stricter than a plain upsert: a lapsed expiry is a caller error, not a
/// no-op write for lazy expiry to clean up.
pub(crate) fn check_expiry(
    until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), ModerationError> {
    match until {
        Some(until) if until <= now => Err(ModerationError::ExpiryInPast),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_blank_reason_gets_default() {
        assert_eq!(normalize_reason(None).unwrap(), DEFAULT_REASON);
        assert_eq!(normalize_reason(Some("   ")).unwrap(), DEFAULT_REASON);
        assert_eq!(normalize_reason(Some(" spam ")).unwrap(), "spam");
    }

    #[test]
    fn test_long_reason_rejected() {
        let long = "a".repeat(MAX_REASON_CHARS + 1);
        assert!(matches!(
            normalize_reason(Some(&long)),
            Err(ModerationError::InvalidReason(_))
        ));
    }

    #[test]
    fn test_expiry_must_be_future() {
        let now = Utc::now();
        assert!(check_expiry(None, now).is_ok());
        assert!(check_expiry(Some(now + Duration::minutes(5)), now).is_ok());
        assert!(matches!(
            check_expiry(Some(now), now),
            Err(ModerationError::ExpiryInPast)
        ));
        assert!(check_expiry(Some(now - Duration::seconds(1)), now).is_err());
    }
}
