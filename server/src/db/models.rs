//! Database Models
//!
//! Typed rows decoded at the gateway boundary. Optional columns are `Option`
//! here and nowhere else.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::ranks::{GrammaticalCase, Rank};

/// Stored rank of an identity inside one community.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MembershipRow {
    pub community_id: i64,
    pub identity_id: i64,
    #[sqlx(try_from = "i16")]
    pub rank: Rank,
    pub updated_at: DateTime<Utc>,
}

/// Restriction kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "restriction_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RestrictionKind {
    Mute,
    Ban,
}

impl RestrictionKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mute => "mute",
            Self::Ban => "ban",
        }
    }
}

impl fmt::Display for RestrictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestrictionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mute" => Ok(Self::Mute),
            "ban" => Ok(Self::Ban),
            other => Err(format!("Unknown restriction kind: {other}")),
        }
    }
}

/// Mute or ban record. `until = None` is permanent.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RestrictionRow {
    pub kind: RestrictionKind,
    pub community_id: i64,
    pub identity_id: i64,
    pub until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RestrictionRow {
    /// Whether the restriction has lapsed at `now`. Permanent rows never lapse.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.until.is_some_and(|until| until <= now)
    }
}

/// Warning entry. Ordered by `id` within a (community, identity) pair.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WarningRow {
    pub id: i64,
    pub community_id: i64,
    pub identity_id: i64,
    pub reason: String,
    pub issued_at: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
}

impl WarningRow {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.until.is_some_and(|until| until <= now)
    }
}

/// Per-community action thresholds, stored as a single keyed map.
#[derive(Debug, Clone, FromRow)]
pub struct PermissionOverrideRow {
    pub community_id: i64,
    pub action_map: Json<BTreeMap<String, i64>>,
    pub updated_at: DateTime<Utc>,
}

/// Community-specific display name for a rank in one grammatical case.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RankNameRow {
    pub community_id: i64,
    #[sqlx(try_from = "i16")]
    pub rank: Rank,
    pub grammatical_case: GrammaticalCase,
    pub name: String,
}

/// Global denylist entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DenylistRow {
    pub identity_id: i64,
    pub reason: String,
    pub added_at: DateTime<Utc>,
}

/// Durable activity summary written by the activity coalescer.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityRow {
    pub identity_id: i64,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Per-day activity counter.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DailyActivityRow {
    pub identity_id: i64,
    pub day: NaiveDate,
    /// Coalescing windows with activity on this day.
    pub active_windows: i32,
}
