//! Pairwise dominance checks.

use std::sync::Arc;

use tracing::debug;

use super::{Rank, RankResolver, ResolvedRank};
use crate::db::GatewayError;

/// Whether `actor` outranks `target`.
///
/// A supreme actor dominates every non-supreme target. Otherwise the actor's
/// effective rank must be strictly higher.
#[must_use]
pub fn dominates(actor: &ResolvedRank, target: &ResolvedRank) -> bool {
    if actor.is_supreme {
        !target.is_supreme
    } else {
        actor.rank > target.rank
    }
}

/// Whether `actor` may hand out `rank`. Non-supreme actors grant strictly below themselves.
#[must_use]
pub fn may_grant(actor: &ResolvedRank, rank: Rank) -> bool {
    actor.is_supreme || rank < actor.rank
}

/// Resolves both parties fresh on every check. Nothing is cached.
#[derive(Clone)]
pub struct HierarchyGuard {
    resolver: Arc<RankResolver>,
}

impl HierarchyGuard {
    #[must_use]
    pub const fn new(resolver: Arc<RankResolver>) -> Self {
        Self { resolver }
    }

    /// Whether `actor_id` may act on `target_id` in `community_id`.
    ///
    /// Acting on oneself is always allowed. Resolution failures are returned
    /// to the caller, which must treat them as a denial.
    #[tracing::instrument(skip(self))]
    pub async fn can_modify(
        &self,
        actor_id: i64,
        target_id: i64,
        community_id: i64,
    ) -> Result<bool, GatewayError> {
        if actor_id == target_id {
            return Ok(true);
        }

        let (actor, target) = futures::try_join!(
            self.resolver.resolve(actor_id, community_id),
            self.resolver.resolve(target_id, community_id),
        )?;

        let allowed = dominates(&actor, &target);
        debug!(
            actor_rank = %actor.rank,
            target_rank = %target.rank,
            allowed,
            "Hierarchy checked"
        );
        Ok(allowed)
    }

    /// Whether `actor_id` may set `target_id`'s rank to `rank`.
    ///
    /// Needs the same dominance as [`Self::can_modify`] and the grant ceiling
    /// of [`may_grant`]. The ceiling applies to self-assignment too, so the
    /// actor is always resolved.
    #[tracing::instrument(skip(self))]
    pub async fn can_assign(
        &self,
        actor_id: i64,
        target_id: i64,
        community_id: i64,
        rank: Rank,
    ) -> Result<bool, GatewayError> {
        let actor = if actor_id == target_id {
            self.resolver.resolve(actor_id, community_id).await?
        } else {
            let (actor, target) = futures::try_join!(
                self.resolver.resolve(actor_id, community_id),
                self.resolver.resolve(target_id, community_id),
            )?;
            if !dominates(&actor, &target) {
                debug!(actor_rank = %actor.rank, target_rank = %target.rank, "Rank change outside hierarchy");
                return Ok(false);
            }
            actor
        };

        let allowed = may_grant(&actor, rank);
        debug!(actor_rank = %actor.rank, %rank, allowed, "Rank grant checked");
        Ok(allowed)
    }
}
