//! Numeric rank scale.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rank on the 0 (unassigned) to 5 (owner) scale.
///
/// Rank 5 on its own is not supreme; supremacy comes from configuration or
/// the live platform role (see [`super::ResolvedRank::is_supreme`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct Rank(u8);

/// Raw value outside the rank scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rank {0} is outside 0..=5")]
pub struct RankOutOfRange(pub i64);

impl Rank {
    /// Implicit default for identities without a stored rank.
    pub const UNASSIGNED: Self = Self(0);
    pub const MEMBER: Self = Self(1);
    pub const JUNIOR_MODERATOR: Self = Self(2);
    pub const MODERATOR: Self = Self(3);
    pub const ADMINISTRATOR: Self = Self(4);
    pub const OWNER: Self = Self(5);

    /// Lowest rank that can be stored explicitly.
    pub const MIN_ASSIGNABLE: Self = Self::MEMBER;
    pub const MAX: Self = Self::OWNER;

    /// Build a rank from any integer on the 0..=5 scale.
    pub fn from_level(level: i64) -> Result<Self, RankOutOfRange> {
        u8::try_from(level)
            .ok()
            .filter(|l| *l <= Self::MAX.0)
            .map(Self)
            .ok_or(RankOutOfRange(level))
    }

    #[must_use]
    pub const fn level(self) -> u8 {
        self.0
    }

    /// Whether this rank may be persisted by the rank mutator.
    #[must_use]
    pub const fn is_assignable(self) -> bool {
        self.0 >= Self::MIN_ASSIGNABLE.0
    }

    /// All ranks from lowest to highest.
    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        (0..=Self::MAX.0).map(Self)
    }
}

impl TryFrom<i16> for Rank {
    type Error = RankOutOfRange;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::from_level(i64::from(value))
    }
}

impl From<Rank> for i16 {
    fn from(rank: Rank) -> Self {
        Self::from(rank.0)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_bounds() {
        assert_eq!(Rank::from_level(0), Ok(Rank::UNASSIGNED));
        assert_eq!(Rank::from_level(5), Ok(Rank::OWNER));
        assert_eq!(Rank::from_level(6), Err(RankOutOfRange(6)));
        assert_eq!(Rank::from_level(-1), Err(RankOutOfRange(-1)));
        assert_eq!(Rank::from_level(256), Err(RankOutOfRange(256)));
    }

    #[test]
    fn test_unassigned_is_not_assignable() {
        assert!(!Rank::UNASSIGNED.is_assignable());
        assert!(Rank::all().skip(1).all(Rank::is_assignable));
    }

    #[test]
    fn test_ordering_follows_level() {
        let ranks: Vec<Rank> = Rank::all().collect();
        assert_eq!(ranks.len(), 6);
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_serde_uses_integer() {
        let json = serde_json::to_string(&Rank::MODERATOR).unwrap();
        assert_eq!(json, "3");

        let parsed: Rank = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, Rank::ADMINISTRATOR);

        assert!(serde_json::from_str::<Rank>("9").is_err());
    }
}
