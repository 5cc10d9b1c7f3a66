//! Effective rank resolution.
//!
//! First match wins:
//! 1. the configured global owner
//! 2. the platform-reported community owner
//! 3. the stored rank, promoted to administrator when the platform reports an
//!    administrator whose stored rank is lower
//!
//! Only the first two paths are supreme.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{queries, GrammaticalCase, Rank, RankError, RankNames};
use crate::db::{Gateway, GatewayError, MembershipRow};
use crate::platform::{PlatformRole, PlatformRoles};

/// Where an effective rank came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankSource {
    GlobalOwner,
    PlatformOwner,
    PlatformAdmin,
    Stored,
}

impl RankSource {
    #[must_use]
    pub const fn is_supreme(self) -> bool {
        matches!(self, Self::GlobalOwner | Self::PlatformOwner)
    }
}

/// Effective rank of one identity in one community, valid for a single check.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRank {
    pub identity_id: i64,
    pub community_id: i64,
    pub rank: Rank,
    pub display_name: String,
    pub is_supreme: bool,
    pub source: RankSource,
}

/// Combine a stored rank with the live platform role.
#[must_use]
pub fn effective_rank(stored: Rank, role: PlatformRole) -> (Rank, RankSource) {
    match role {
        PlatformRole::Owner => (Rank::OWNER, RankSource::PlatformOwner),
        PlatformRole::Administrator if stored < Rank::ADMINISTRATOR => {
            (Rank::ADMINISTRATOR, RankSource::PlatformAdmin)
        }
        _ => (stored, RankSource::Stored),
    }
}

/// Read-only rank resolution plus the companion rank mutator.
pub struct RankResolver {
    gateway: Gateway,
    platform: Arc<dyn PlatformRoles>,
    names: RankNames,
    global_owner: Option<i64>,
}

impl RankResolver {
    pub fn new(
        gateway: Gateway,
        platform: Arc<dyn PlatformRoles>,
        global_owner: Option<i64>,
    ) -> Self {
        Self {
            names: RankNames::new(gateway.clone()),
            gateway,
            platform,
            global_owner,
        }
    }

    /// Display-name overrides used by this resolver.
    #[must_use]
    pub const fn names(&self) -> &RankNames {
        &self.names
    }

    /// Resolve with the nominative display name.
    pub async fn resolve(
        &self,
        identity_id: i64,
        community_id: i64,
    ) -> Result<ResolvedRank, GatewayError> {
        self.resolve_in_case(identity_id, community_id, GrammaticalCase::Nominative)
            .await
    }

    /// Resolve the effective rank of `identity_id` in `community_id`.
    ///
    /// A failed stored-rank read is returned as an error. A failed platform
    /// lookup counts as [`PlatformRole::Unknown`].
    #[tracing::instrument(skip(self))]
    pub async fn resolve_in_case(
        &self,
        identity_id: i64,
        community_id: i64,
        case: GrammaticalCase,
    ) -> Result<ResolvedRank, GatewayError> {
        let (rank, source) = if self.global_owner == Some(identity_id) {
            (Rank::OWNER, RankSource::GlobalOwner)
        } else {
            let role = self.platform_role(community_id, identity_id).await;
            if role == PlatformRole::Owner {
                effective_rank(Rank::UNASSIGNED, role)
            } else {
                let stored = queries::stored_rank(&self.gateway, community_id, identity_id).await?;
                effective_rank(stored, role)
            }
        };

        let display_name = self.names.display_name(community_id, rank, case).await;
        debug!(identity_id, community_id, rank = %rank, ?source, "Rank resolved");

        Ok(ResolvedRank {
            identity_id,
            community_id,
            rank,
            display_name,
            is_supreme: source.is_supreme(),
            source,
        })
    }

    async fn platform_role(&self, community_id: i64, identity_id: i64) -> PlatformRole {
        match self.platform.member_role(community_id, identity_id).await {
            Ok(role) => role,
            Err(e) => {
                warn!(community_id, identity_id, error = %e, "Platform role lookup failed");
                PlatformRole::Unknown
            }
        }
    }

    /// Persist a rank. Only 1-5 can be stored; 0 is the implicit default.
    #[tracing::instrument(skip(self))]
    pub async fn set_rank(
        &self,
        community_id: i64,
        identity_id: i64,
        level: i64,
    ) -> Result<MembershipRow, RankError> {
        let rank = Rank::from_level(level)?;
        if !rank.is_assignable() {
            return Err(RankError::NotAssignable(level));
        }

        let row = queries::upsert_rank(&self.gateway, community_id, identity_id, rank).await?;
        info!(community_id, identity_id, rank = %rank, "Rank stored");
        Ok(row)
    }

    /// Identities holding a stored rank, highest first.
    pub async fn list_ranked(&self, community_id: i64) -> Result<Vec<MembershipRow>, GatewayError> {
        queries::list_ranked(&self.gateway, community_id).await
    }
}
