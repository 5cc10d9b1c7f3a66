//! Per-community action thresholds.
//!
//! One row per community holds every override as a JSONB map keyed by action
//! id. Missing keys fall back to the static default.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::types::Json;
use tracing::{info, warn};

use super::{ModerationAction, PermissionError};
use crate::db::{Gateway, GatewayError, PermissionOverrideRow};
use crate::ranks::Rank;

/// Effective threshold of one known action.
#[derive(Debug, Clone, Serialize)]
pub struct Threshold {
    pub action: ModerationAction,
    pub description: &'static str,
    pub min_rank: Rank,
    pub overridden: bool,
}

#[derive(Debug, Clone)]
pub struct PermissionTable {
    gateway: Gateway,
}

impl PermissionTable {
    #[must_use]
    pub const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Raw override map of a community. Empty when none is stored.
    pub async fn overrides(
        &self,
        community_id: i64,
    ) -> Result<BTreeMap<String, i64>, GatewayError> {
        let row = self
            .gateway
            .run("permission_overrides", |pool| async move {
                sqlx::query_as::<_, PermissionOverrideRow>(
                    r"
                    SELECT community_id, action_map, updated_at
                    FROM permission_overrides
                    WHERE community_id = $1
                    ",
                )
                .bind(community_id)
                .fetch_optional(&pool)
                .await
            })
            .await?;

        Ok(row.map(|r| r.action_map.0).unwrap_or_default())
    }

    /// Minimum rank for `action_id`: the community override, else `static_default`.
    #[tracing::instrument(skip(self))]
    pub async fn required_rank(
        &self,
        community_id: i64,
        action_id: &str,
        static_default: Rank,
    ) -> Result<Rank, GatewayError> {
        let overrides = self.overrides(community_id).await?;
        Ok(resolve_threshold(community_id, &overrides, action_id, static_default).0)
    }

    /// Whether `actor_rank` meets the threshold for `action`.
    pub async fn permits(
        &self,
        community_id: i64,
        action: ModerationAction,
        actor_rank: Rank,
    ) -> Result<bool, GatewayError> {
        let required = self
            .required_rank(community_id, action.id(), action.default_rank())
            .await?;
        Ok(actor_rank >= required)
    }

    /// Every known action with its effective threshold.
    pub async fn thresholds(&self, community_id: i64) -> Result<Vec<Threshold>, GatewayError> {
        let overrides = self.overrides(community_id).await?;
        Ok(ModerationAction::all()
            .iter()
            .map(|action| {
                let (min_rank, overridden) =
                    resolve_threshold(community_id, &overrides, action.id(), action.default_rank());
                Threshold {
                    action: *action,
                    description: action.description(),
                    min_rank,
                    overridden,
                }
            })
            .collect())
    }

    /// Store an override. Concurrent writers to different keys both land;
    /// writers to the same key resolve last-writer-wins.
    #[tracing::instrument(skip(self))]
    pub async fn set_override(
        &self,
        community_id: i64,
        action_id: &str,
        min_rank: i64,
    ) -> Result<Rank, PermissionError> {
        let action: ModerationAction = action_id
            .parse()
            .map_err(|_| PermissionError::UnknownAction(action_id.to_string()))?;
        let rank = Rank::from_level(min_rank).map_err(|_| PermissionError::InvalidThreshold(min_rank))?;

        self.gateway
            .run("permission_override_set", |pool| async move {
                let entry = Json(BTreeMap::from([(action.id().to_string(), min_rank)]));
                sqlx::query(
                    r"
                    INSERT INTO permission_overrides (community_id, action_map)
                    VALUES ($1, $2)
                    ON CONFLICT (community_id)
                    DO UPDATE SET action_map = permission_overrides.action_map || EXCLUDED.action_map,
                                  updated_at = NOW()
                    ",
                )
                .bind(community_id)
                .bind(entry)
                .execute(&pool)
                .await
            })
            .await?;

        info!(community_id, action = %action, min_rank = %rank, "Permission override stored");
        Ok(rank)
    }
}

/// Pick the threshold from an override map. Returns whether an override applied.
fn resolve_threshold(
    community_id: i64,
    overrides: &BTreeMap<String, i64>,
    action_id: &str,
    static_default: Rank,
) -> (Rank, bool) {
    match overrides.get(action_id) {
        None => (static_default, false),
        Some(&level) => match Rank::from_level(level) {
            Ok(rank) => (rank, true),
            Err(_) => {
                warn!(community_id, action_id, level, "Ignoring out-of-range permission override");
                (static_default, false)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::unreachable_gateway;

    #[test]
    fn test_missing_override_uses_default() {
        let overrides = BTreeMap::new();
        assert_eq!(
            resolve_threshold(-100, &overrides, "ban", Rank::ADMINISTRATOR),
            (Rank::ADMINISTRATOR, false)
        );
    }

    #[test]
    fn test_override_replaces_default() {
        let overrides = BTreeMap::from([("ban".to_string(), 2)]);
        assert_eq!(
            resolve_threshold(-100, &overrides, "ban", Rank::ADMINISTRATOR),
            (Rank::JUNIOR_MODERATOR, true)
        );
        // Other actions are untouched.
        assert_eq!(
            resolve_threshold(-100, &overrides, "mute", Rank::JUNIOR_MODERATOR),
            (Rank::JUNIOR_MODERATOR, false)
        );
    }

    #[test]
    fn test_corrupt_override_is_ignored() {
        let overrides = BTreeMap::from([("ban".to_string(), 17)]);
        assert_eq!(
            resolve_threshold(-100, &overrides, "ban", Rank::ADMINISTRATOR),
            (Rank::ADMINISTRATOR, false)
        );
    }

    #[tokio::test]
    async fn test_set_override_validates_before_store() {
        let table = PermissionTable::new(unreachable_gateway());

        assert!(matches!(
            table.set_override(-100, "kick", 3).await,
            Err(PermissionError::UnknownAction(id)) if id == "kick"
        ));
        assert!(matches!(
            table.set_override(-100, "ban", 6).await,
            Err(PermissionError::InvalidThreshold(6))
        ));
        assert!(matches!(
            table.set_override(-100, "ban", 3).await,
            Err(PermissionError::Gateway(e)) if e.is_transport()
        ));
    }
}
