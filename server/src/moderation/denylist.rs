//! Global spam denylist
//!
//! Cross-community denylist with a write-through in-process cache. Both
//! positive and negative answers are cached; failed lookups are not. A
//! generation counter keeps a lookup that raced a write from caching a
//! stale answer. Entries expire after a TTL and are dropped by `prune`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::info;

use super::{normalize_reason, ModerationError};
use crate::db::{DenylistRow, Gateway, GatewayError};

pub struct Denylist {
    gateway: Gateway,
    /// Cached answer and when it was stored.
    cache: DashMap<i64, (bool, Instant)>,
    /// Bumped on every write.
    generation: AtomicU64,
    ttl: Duration,
}

impl Denylist {
    #[must_use]
    pub fn new(gateway: Gateway, ttl: Duration) -> Self {
        Self {
            gateway,
            cache: DashMap::new(),
            generation: AtomicU64::new(0),
            ttl,
        }
    }

    fn cached_answer(&self, identity_id: i64) -> Option<bool> {
        let entry = self.cache.get(&identity_id)?;
        let (listed, stored_at) = *entry;
        (stored_at.elapsed() < self.ttl).then_some(listed)
    }

    /// Whether `identity_id` is denylisted.
    pub async fn contains(&self, identity_id: i64) -> Result<bool, GatewayError> {
        if let Some(hit) = self.cached_answer(identity_id) {
            return Ok(hit);
        }

        let gen_before = self.generation.load(Ordering::Acquire);
        let found: Option<i64> = self
            .gateway
            .run("denylist_contains", |pool| async move {
                sqlx::query_scalar("SELECT identity_id FROM denylist WHERE identity_id = $1")
                    .bind(identity_id)
                    .fetch_optional(&pool)
                    .await
            })
            .await?;

        let listed = found.is_some();
        if self.generation.load(Ordering::Acquire) == gen_before {
            self.cache.insert(identity_id, (listed, Instant::now()));
        }
        Ok(listed)
    }

    /// Add or update an entry.
    #[tracing::instrument(skip(self, reason))]
    pub async fn add(
        &self,
        identity_id: i64,
        reason: Option<&str>,
    ) -> Result<DenylistRow, ModerationError> {
        let reason = normalize_reason(reason)?;
        let reason = reason.as_str();

        let row = self
            .gateway
            .run("denylist_add", |pool| async move {
                sqlx::query_as::<_, DenylistRow>(
                    r"
                    INSERT INTO denylist (identity_id, reason)
                    VALUES ($1, $2)
                    ON CONFLICT (identity_id) DO UPDATE SET reason = EXCLUDED.reason
                    RETURNING identity_id, reason, added_at
                    ",
                )
                .bind(identity_id)
                .bind(reason)
                .fetch_one(&pool)
                .await
            })
            .await?;

        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.insert(identity_id, (true, Instant::now()));
        info!(identity_id, "Identity denylisted");
        Ok(row)
    }

    /// Remove an entry. Returns `true` if one existed.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, identity_id: i64) -> Result<bool, GatewayError> {
        let result = self
            .gateway
            .run("denylist_remove", |pool| async move {
                sqlx::query("DELETE FROM denylist WHERE identity_id = $1")
                    .bind(identity_id)
                    .execute(&pool)
                    .await
            })
            .await?;

        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.insert(identity_id, (false, Instant::now()));
        info!(identity_id, "Identity removed from denylist");
        Ok(result.rows_affected() > 0)
    }

    /// Drop answers older than the TTL. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, (_, stored_at)| stored_at.elapsed() < self.ttl);
        before.saturating_sub(self.cache.len())
    }

    /// Number of cached answers.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
