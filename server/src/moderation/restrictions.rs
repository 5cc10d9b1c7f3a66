//! Mute and ban ledger.
//!
//! At most one row per (kind, community, identity). `set` replaces, `clear`
//! deletes, and a row whose `until` has passed is deleted by the read that
//! finds it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::{check_expiry, ModerationError};
use crate::db::{Gateway, GatewayError, RestrictionKind, RestrictionRow};

/// Outcome of a restriction check that never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RestrictionStatus {
    Restricted { until: Option<DateTime<Utc>> },
    Clear,
    /// The store could not be reached.
    Unavailable,
}

impl RestrictionStatus {
    /// Whether the identity must be treated as restricted. An unavailable
    /// store blocks.
    #[must_use]
    pub const fn blocks(&self) -> bool {
        !matches!(self, Self::Clear)
    }
}

#[derive(Debug, Clone)]
pub struct RestrictionLedger {
    gateway: Gateway,
}

impl RestrictionLedger {
    #[must_use]
    pub const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Active restriction for the key, deleting it first if it has lapsed.
    #[tracing::instrument(skip(self))]
    pub async fn get(
        &self,
        kind: RestrictionKind,
        community_id: i64,
        identity_id: i64,
    ) -> Result<Option<RestrictionRow>, GatewayError> {
        let row = self
            .gateway
            .run("restriction_get", |pool| async move {
                sqlx::query_as::<_, RestrictionRow>(
                    r"
                    SELECT kind, community_id, identity_id, until, created_at
                    FROM restrictions
                    WHERE kind = $1 AND community_id = $2 AND identity_id = $3
                    ",
                )
                .bind(kind)
                .bind(community_id)
                .bind(identity_id)
                .fetch_optional(&pool)
                .await
            })
            .await?;

        let now = Utc::now();
        match row {
            Some(row) if row.is_expired_at(now) => {
                self.purge_expired(kind, community_id, identity_id, now).await;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Whether a restriction is currently in force.
    pub async fn is_active(
        &self,
        kind: RestrictionKind,
        community_id: i64,
        identity_id: i64,
    ) -> Result<bool, GatewayError> {
        Ok(self.get(kind, community_id, identity_id).await?.is_some())
    }

    /// Fail-closed check. Store failures come back as
    /// [`RestrictionStatus::Unavailable`].
    pub async fn status(
        &self,
        kind: RestrictionKind,
        community_id: i64,
        identity_id: i64,
    ) -> RestrictionStatus {
        match self.get(kind, community_id, identity_id).await {
            Ok(Some(row)) => RestrictionStatus::Restricted { until: row.until },
            Ok(None) => RestrictionStatus::Clear,
            Err(e) => {
                error!(%kind, community_id, identity_id, error = %e, "Restriction check failed, treating as restricted");
                RestrictionStatus::Unavailable
            }
        }
    }

    /// Restrict until `until` (`None` is permanent), replacing any existing row.
    ///
    /// An `until` that is not in the future is refused with `ExpiryInPast`
    /// rather than stored as an already-lapsed restriction.
    #[tracing::instrument(skip(self))]
    pub async fn set(
        &self,
        kind: RestrictionKind,
        community_id: i64,
        identity_id: i64,
        until: Option<DateTime<Utc>>,
    ) -> Result<RestrictionRow, ModerationError> {
        check_expiry(until, Utc::now())?;

        let row = self
            .gateway
            .run("restriction_set", |pool| async move {
                sqlx::query_as::<_, RestrictionRow>(
                    r"
                    INSERT INTO restrictions (kind, community_id, identity_id, until)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (kind, community_id, identity_id)
                    DO UPDATE SET until = EXCLUDED.until, created_at = NOW()
                    RETURNING kind, community_id, identity_id, until, created_at
                    ",
                )
                .bind(kind)
                .bind(community_id)
                .bind(identity_id)
                .bind(until)
                .fetch_one(&pool)
                .await
            })
            .await?;

        info!(%kind, community_id, identity_id, ?until, "Restriction set");
        Ok(row)
    }

    /// Lift a restriction. Returns `true` if one existed.
    #[tracing::instrument(skip(self))]
    pub async fn clear(
        &self,
        kind: RestrictionKind,
        community_id: i64,
        identity_id: i64,
    ) -> Result<bool, GatewayError> {
        let result = self
            .gateway
            .run("restriction_clear", |pool| async move {
                sqlx::query(
                    "DELETE FROM restrictions WHERE kind = $1 AND community_id = $2 AND identity_id = $3",
                )
                .bind(kind)
                .bind(community_id)
                .bind(identity_id)
                .execute(&pool)
                .await
            })
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!(%kind, community_id, identity_id, "Restriction cleared");
        }
        Ok(removed)
    }

    /// Delete the row only while it is still expired, so a concurrent `set`
    /// survives. Failures are logged and ignored.
    async fn purge_expired(
        &self,
        kind: RestrictionKind,
        community_id: i64,
        identity_id: i64,
        now: DateTime<Utc>,
    ) {
        let result = self
            .gateway
            .run("restriction_purge", |pool| async move {
                sqlx::query(
                    r"
                    DELETE FROM restrictions
                    WHERE kind = $1 AND community_id = $2 AND identity_id = $3
                      AND until IS NOT NULL AND until <= $4
                    ",
                )
                .bind(kind)
                .bind(community_id)
                .bind(identity_id)
                .bind(now)
                .execute(&pool)
                .await
            })
            .await;

        if let Err(e) = result {
            warn!(%kind, community_id, identity_id, error = %e, "Failed to purge expired restriction");
        }
    }
}
