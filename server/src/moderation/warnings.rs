//! Warning ledger.
//!
//! Warnings are ordered by insertion. Positions are 1-based indexes into the
//! active list as it is read at call time, not stable identifiers: a
//! concurrent change between a listing and a `remove_at` can shift them.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::{check_expiry, normalize_reason, ModerationError};
use crate::db::{Gateway, GatewayError, WarningRow};

#[derive(Debug, Clone)]
pub struct WarningLedger {
    gateway: Gateway,
}

impl WarningLedger {
    #[must_use]
    pub const fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Append a warning. Returns the number of active warnings including it.
    ///
    /// Refuses an `until` that is not in the future; such a warning would
    /// never count.
    #[tracing::instrument(skip(self, reason))]
    pub async fn add(
        &self,
        community_id: i64,
        identity_id: i64,
        reason: Option<&str>,
        until: Option<DateTime<Utc>>,
    ) -> Result<usize, ModerationError> {
        let reason = normalize_reason(reason)?;
        check_expiry(until, Utc::now())?;

        self.insert(community_id, identity_id, &reason, Utc::now(), until)
            .await?;

        let active = self.list_active(community_id, identity_id).await?.len();
        info!(community_id, identity_id, active, "Warning added");
        Ok(active)
    }

    /// Store one warning stamped `issued_at`. Returns `false` when a warning
    /// with the same stamp already exists, which is what a retried insert
    /// that committed on the first attempt looks like.
    pub(crate) async fn insert(
        &self,
        community_id: i64,
        identity_id: i64,
        reason: &str,
        issued_at: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<bool, GatewayError> {
        let result = self
            .gateway
            .run("warning_add", |pool| async move {
                sqlx::query(
                    r"
                    INSERT INTO warnings (community_id, identity_id, reason, issued_at, until)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (community_id, identity_id, issued_at) DO NOTHING
                    ",
                )
                .bind(community_id)
                .bind(identity_id)
                .bind(reason)
                .bind(issued_at)
                .bind(until)
                .execute(&pool)
                .await
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Active warnings, oldest first. Expired entries found here are deleted.
    pub async fn list_active(
        &self,
        community_id: i64,
        identity_id: i64,
    ) -> Result<Vec<WarningRow>, GatewayError> {
        let rows = self
            .gateway
            .run("warning_list", |pool| async move {
                sqlx::query_as::<_, WarningRow>(
                    r"
                    SELECT id, community_id, identity_id, reason, issued_at, until
                    FROM warnings
                    WHERE community_id = $1 AND identity_id = $2
                    ORDER BY id ASC
                    ",
                )
                .bind(community_id)
                .bind(identity_id)
                .fetch_all(&pool)
                .await
            })
            .await?;

        let now = Utc::now();
        let (expired, active): (Vec<_>, Vec<_>) =
            rows.into_iter().partition(|w| w.is_expired_at(now));

        if !expired.is_empty() {
            let ids: Vec<i64> = expired.iter().map(|w| w.id).collect();
            self.purge_expired(&ids, now).await;
        }

        Ok(active)
    }

    /// Remove the warning at 1-based `position` of the freshly read active list.
    /// Returns `false` when the position is out of range.
    #[tracing::instrument(skip(self))]
    pub async fn remove_at(
        &self,
        community_id: i64,
        identity_id: i64,
        position: usize,
    ) -> Result<bool, GatewayError> {
        let Some(index) = position.checked_sub(1) else {
            return Ok(false);
        };

        let active = self.list_active(community_id, identity_id).await?;
        match active.get(index) {
            Some(target) => self.delete_one(target.id).await,
            None => Ok(false),
        }
    }

    /// Remove the most recent active warning.
    #[tracing::instrument(skip(self))]
    pub async fn remove_latest(
        &self,
        community_id: i64,
        identity_id: i64,
    ) -> Result<bool, GatewayError> {
        let active = self.list_active(community_id, identity_id).await?;
        match active.last() {
            Some(latest) => self.delete_one(latest.id).await,
            None => Ok(false),
        }
    }

    /// Remove every warning of the pair, active or not. Returns the number removed.
    #[tracing::instrument(skip(self))]
    pub async fn clear_all(&self, community_id: i64, identity_id: i64) -> Result<u64, GatewayError> {
        let result = self
            .gateway
            .run("warning_clear_all", |pool| async move {
                sqlx::query("DELETE FROM warnings WHERE community_id = $1 AND identity_id = $2")
                    .bind(community_id)
                    .bind(identity_id)
                    .execute(&pool)
                    .await
            })
            .await?;

        info!(community_id, identity_id, removed = result.rows_affected(), "Warnings cleared");
        Ok(result.rows_affected())
    }

    async fn delete_one(&self, id: i64) -> Result<bool, GatewayError> {
        let result = self
            .gateway
            .run("warning_delete", |pool| async move {
                sqlx::query("DELETE FROM warnings WHERE id = $1")
                    .bind(id)
                    .execute(&pool)
                    .await
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, ids: &[i64], now: DateTime<Utc>) {
        let result = self
            .gateway
            .run("warning_purge", |pool| async move {
                sqlx::query("DELETE FROM warnings WHERE id = ANY($1) AND until <= $2")
                    .bind(ids)
                    .bind(now)
                    .execute(&pool)
                    .await
            })
            .await;

        if let Err(e) = result {
            warn!(count = ids.len(), error = %e, "Failed to purge expired warnings");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::unreachable_gateway;
    use crate::moderation::MAX_REASON_CHARS;

    #[tokio::test]
    async fn test_position_zero_is_never_valid() {
        // Returns before touching the store.
        let ledger = WarningLedger::new(unreachable_gateway());
        assert!(!ledger.remove_at(-100, 7, 0).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_validates_before_store() {
        let ledger = WarningLedger::new(unreachable_gateway());

        let long = "x".repeat(MAX_REASON_CHARS + 1);
        assert!(matches!(
            ledger.add(-100, 7, Some(&long), None).await,
            Err(ModerationError::InvalidReason(_))
        ));

        let past = Utc::now() - Duration::hours(1);
        assert!(matches!(
            ledger.add(-100, 7, Some("spam"), Some(past)).await,
            Err(ModerationError::ExpiryInPast)
        ));
    }

    #[tokio::test]
    async fn test_add_surfaces_transport_failure() {
        let ledger = WarningLedger::new(unreachable_gateway());
        match ledger.add(-100, 7, Some("spam"), None).await {
            Err(ModerationError::Gateway(e)) => assert!(e.is_transport()),
            other => panic!("expected transport failure, got {other:?}"),
        }
    }
}
