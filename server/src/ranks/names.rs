//! Rank display names.
//!
//! Communities may rename any rank per grammatical case without changing its
//! numeric meaning. Lookups fail open: when the store is unreachable the
//! built-in name is used.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Rank, RankError};
use crate::db::{Gateway, GatewayError, RankNameRow};

/// Longest accepted display name, in characters.
pub const MAX_NAME_CHARS: usize = 64;

/// Grammatical case a rank name is rendered in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "grammatical_case", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GrammaticalCase {
    #[default]
    Nominative,
    Genitive,
    Dative,
    Accusative,
    Instrumental,
    Prepositional,
}

/// Built-in rank name.
#[must_use]
pub const fn default_name(rank: Rank) -> &'static str {
    match rank.level() {
        0 => "Unranked",
        1 => "Member",
        2 => "Junior Moderator",
        3 => "Moderator",
        4 => "Administrator",
        _ => "Owner",
    }
}

/// Community rank-name overrides.
#[derive(Debug, Clone)]
pub struct RankNames {
    gateway: Gateway,
}

impl RankNames {
    #[must_use]
    pub const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Name for `rank` in `case`.
    ///
    /// Falls back to the community's nominative override, then to
    /// [`default_name`].
    #[tracing::instrument(skip(self))]
    pub async fn display_name(
        &self,
        community_id: i64,
        rank: Rank,
        case: GrammaticalCase,
    ) -> String {
        match self.lookup(community_id, rank, case).await {
            Ok(Some(name)) => name,
            Ok(None) => default_name(rank).to_string(),
            Err(e) => {
                warn!(community_id, rank = %rank, error = %e, "Rank name lookup failed, using default");
                default_name(rank).to_string()
            }
        }
    }

    async fn lookup(
        &self,
        community_id: i64,
        rank: Rank,
        case: GrammaticalCase,
    ) -> Result<Option<String>, GatewayError> {
        self.gateway
            .run("rank_name_lookup", |pool| async move {
                sqlx::query_scalar(
                    r"
                    SELECT name
                    FROM rank_display_overrides
                    WHERE community_id = $1
                      AND rank = $2
                      AND grammatical_case IN ($3, 'nominative')
                    ORDER BY CASE WHEN grammatical_case = $3 THEN 0 ELSE 1 END
                    LIMIT 1
                    ",
                )
                .bind(community_id)
                .bind(i16::from(rank))
                .bind(case)
                .fetch_optional(&pool)
                .await
            })
            .await
    }

    /// All overrides of a community.
    pub async fn list(&self, community_id: i64) -> Result<Vec<RankNameRow>, GatewayError> {
        self.gateway
            .run("rank_name_list", |pool| async move {
                sqlx::query_as::<_, RankNameRow>(
                    r"
                    SELECT community_id, rank, grammatical_case, name
                    FROM rank_display_overrides
                    WHERE community_id = $1
                    ORDER BY rank DESC, grammatical_case
                    ",
                )
                .bind(community_id)
                .fetch_all(&pool)
                .await
            })
            .await
    }

    /// Set the community's name for `rank` in `case`.
    #[tracing::instrument(skip(self))]
    pub async fn set(
        &self,
        community_id: i64,
        rank: Rank,
        case: GrammaticalCase,
        name: &str,
    ) -> Result<RankNameRow, RankError> {
        let name = validate_name(name)?;

        let row = self
            .gateway
            .run("rank_name_set", |pool| async move {
                sqlx::query_as::<_, RankNameRow>(
                    r"
                    INSERT INTO rank_display_overrides (community_id, rank, grammatical_case, name)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (community_id, rank, grammatical_case)
                    DO UPDATE SET name = EXCLUDED.name
                    RETURNING community_id, rank, grammatical_case, name
                    ",
                )
                .bind(community_id)
                .bind(i16::from(rank))
                .bind(case)
                .bind(name)
                .fetch_one(&pool)
                .await
            })
            .await?;

        Ok(row)
    }

    /// Drop an override. Returns `true` if one existed.
    pub async fn clear(
        &self,
        community_id: i64,
        rank: Rank,
        case: GrammaticalCase,
    ) -> Result<bool, GatewayError> {
        let result = self
            .gateway
            .run("rank_name_clear", |pool| async move {
                sqlx::query(
                    r"
                    DELETE FROM rank_display_overrides
                    WHERE community_id = $1 AND rank = $2 AND grammatical_case = $3
                    ",
                )
                .bind(community_id)
                .bind(i16::from(rank))
                .bind(case)
                .execute(&pool)
                .await
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn validate_name(name: &str) -> Result<&str, RankError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RankError::InvalidName("name must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(RankError::InvalidName(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::unreachable_gateway;

    #[test]
    fn test_default_names_cover_scale() {
        let names: Vec<&str> = Rank::all().map(default_name).collect();
        assert_eq!(names.first(), Some(&"Unranked"));
        assert_eq!(names.last(), Some(&"Owner"));

        let mut unique = names.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  Keeper  ").unwrap(), "Keeper");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_CHARS + 1)).is_err());
        assert!(validate_name(&"я".repeat(MAX_NAME_CHARS)).is_ok());
    }

    #[test]
    fn test_case_serde_is_lowercase() {
        let json = serde_json::to_string(&GrammaticalCase::Instrumental).unwrap();
        assert_eq!(json, "\"instrumental\"");
        assert_eq!(GrammaticalCase::default(), GrammaticalCase::Nominative);
    }

    #[tokio::test]
    async fn test_display_name_fails_open() {
        let names = RankNames::new(unreachable_gateway());
        let name = names
            .display_name(-100, Rank::MODERATOR, GrammaticalCase::Genitive)
            .await;
        assert_eq!(name, "Moderator");
    }
}
