//! Community membership queries.

use tracing::warn;

use super::Rank;
use crate::db::{Gateway, GatewayError, MembershipRow};

/// Stored rank of `identity_id` in `community_id`; [`Rank::UNASSIGNED`] when absent.
pub async fn stored_rank(
    gateway: &Gateway,
    community_id: i64,
    identity_id: i64,
) -> Result<Rank, GatewayError> {
    let level: Option<i16> = gateway
        .run("stored_rank", |pool| async move {
            sqlx::query_scalar(
                "SELECT rank FROM community_membership WHERE community_id = $1 AND identity_id = $2",
            )
            .bind(community_id)
            .bind(identity_id)
            .fetch_optional(&pool)
            .await
        })
        .await?;

    Ok(match level {
        None => Rank::UNASSIGNED,
        Some(level) => Rank::try_from(level).unwrap_or_else(|e| {
            warn!(community_id, identity_id, error = %e, "Stored rank out of range, treating as unassigned");
            Rank::UNASSIGNED
        }),
    })
}

/// Upsert the stored rank. Callers validate assignability.
pub async fn upsert_rank(
    gateway: &Gateway,
    community_id: i64,
    identity_id: i64,
    rank: Rank,
) -> Result<MembershipRow, GatewayError> {
    gateway
        .run("upsert_rank", |pool| async move {
            sqlx::query_as::<_, MembershipRow>(
                r"
                INSERT INTO community_membership (community_id, identity_id, rank)
                VALUES ($1, $2, $3)
                ON CONFLICT (community_id, identity_id)
                DO UPDATE SET rank = EXCLUDED.rank, updated_at = NOW()
                RETURNING community_id, identity_id, rank, updated_at
                ",
            )
            .bind(community_id)
            .bind(identity_id)
            .bind(i16::from(rank))
            .fetch_one(&pool)
            .await
        })
        .await
}

/// All identities with a stored rank above [`Rank::UNASSIGNED`], highest first.
pub async fn list_ranked(
    gateway: &Gateway,
    community_id: i64,
) -> Result<Vec<MembershipRow>, GatewayError> {
    gateway
        .run("list_ranked", |pool| async move {
            sqlx::query_as::<_, MembershipRow>(
                r"
                SELECT community_id, identity_id, rank, updated_at
                FROM community_membership
                WHERE community_id = $1 AND rank > 0
                ORDER BY rank DESC, identity_id ASC
                ",
            )
            .bind(community_id)
            .fetch_all(&pool)
            .await
        })
        .await
}
