//! Moderation actions with configurable rank thresholds.

use std::fmt;
use std::str::FromStr;

use crate::ranks::Rank;

/// Action a community can put behind a minimum rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    /// Ban a member from the community
    Ban,
    /// Mute a member
    Mute,
    /// Issue a warning
    Warn,
    /// Delete other members' messages
    Delete,
    /// Change a member's stored rank
    SetRank,
    /// Award points or decorations
    Award,
}

impl ModerationAction {
    /// Identifier used as the key in a community's override map.
    ///
    /// # Examples
    ///
    /// ```
    /// use bailiff_server::permissions::ModerationAction;
    ///
    /// assert_eq!(ModerationAction::SetRank.id(), "set_rank");
    /// ```
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::Ban => "ban",
            Self::Mute => "mute",
            Self::Warn => "warn",
            Self::Delete => "delete",
            Self::SetRank => "set_rank",
            Self::Award => "award",
        }
    }

    /// Minimum rank when the community has no override.
    #[must_use]
    pub const fn default_rank(&self) -> Rank {
        match self {
            Self::Ban => Rank::ADMINISTRATOR,
            Self::Mute | Self::Warn | Self::Delete => Rank::JUNIOR_MODERATOR,
            Self::SetRank => Rank::OWNER,
            Self::Award => Rank::MODERATOR,
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Ban,
            Self::Mute,
            Self::Warn,
            Self::Delete,
            Self::SetRank,
            Self::Award,
        ]
    }

    /// Returns a human-readable description of the action.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Ban => "Ban members",
            Self::Mute => "Mute members",
            Self::Warn => "Warn members",
            Self::Delete => "Delete messages",
            Self::SetRank => "Change member ranks",
            Self::Award => "Award members",
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModerationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|a| a.id() == s)
            .ok_or_else(|| format!("Unknown action: {s}"))
    }
}
