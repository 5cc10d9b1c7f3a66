//! Rank API
//!
//! Rank resolution, rank writes, display-name overrides and hierarchy checks.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::{ApiError, AppState};
use crate::db::{MembershipRow, RankNameRow};
use crate::ranks::{GrammaticalCase, Rank, ResolvedRank};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CaseQuery {
    #[serde(default)]
    pub case: GrammaticalCase,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetRankRequest {
    #[validate(range(min = 1, max = 5, message = "rank must be between 1 and 5"))]
    pub rank: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetRankNameRequest {
    #[validate(length(min = 1, max = 64, message = "name must be 1-64 characters"))]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RankNameResponse {
    pub rank: Rank,
    pub case: GrammaticalCase,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct HierarchyQuery {
    pub actor: i64,
    pub target: i64,
    /// Rank the actor wants to give the target. Adds the grant ceiling.
    pub rank: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HierarchyResponse {
    pub actor: i64,
    pub target: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

fn parse_rank(level: i64) -> Result<Rank, ApiError> {
    Rank::from_level(level).map_err(|e| ApiError::validation(e.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /api/communities/{community_id}/ranks`
pub async fn list_ranked(
    State(state): State<AppState>,
    Path(community_id): Path<i64>,
) -> Result<Json<Vec<MembershipRow>>, ApiError> {
    Ok(Json(state.resolver.list_ranked(community_id).await?))
}

/// `GET /api/communities/{community_id}/members/{identity_id}/rank`
pub async fn get_rank(
    State(state): State<AppState>,
    Path((community_id, identity_id)): Path<(i64, i64)>,
    Query(query): Query<CaseQuery>,
) -> Result<Json<ResolvedRank>, ApiError> {
    let resolved = state
        .resolver
        .resolve_in_case(identity_id, community_id, query.case)
        .await?;
    Ok(Json(resolved))
}

/// `PUT /api/communities/{community_id}/members/{identity_id}/rank`
pub async fn set_rank(
    State(state): State<AppState>,
    Path((community_id, identity_id)): Path<(i64, i64)>,
    Json(body): Json<SetRankRequest>,
) -> Result<Json<MembershipRow>, ApiError> {
    body.validate()?;
    let row = state
        .resolver
        .set_rank(community_id, identity_id, body.rank)
        .await?;
    Ok(Json(row))
}

/// `GET /api/communities/{community_id}/rank-names/{rank}?case=`
pub async fn get_rank_name(
    State(state): State<AppState>,
    Path((community_id, rank)): Path<(i64, i64)>,
    Query(query): Query<CaseQuery>,
) -> Result<Json<RankNameResponse>, ApiError> {
    let rank = parse_rank(rank)?;
    let name = state
        .resolver
        .names()
        .display_name(community_id, rank, query.case)
        .await;

    Ok(Json(RankNameResponse {
        rank,
        case: query.case,
        name,
    }))
}

/// `PUT /api/communities/{community_id}/rank-names/{rank}?case=`
pub async fn set_rank_name(
    State(state): State<AppState>,
    Path((community_id, rank)): Path<(i64, i64)>,
    Query(query): Query<CaseQuery>,
    Json(body): Json<SetRankNameRequest>,
) -> Result<Json<RankNameRow>, ApiError> {
    body.validate()?;
    let rank = parse_rank(rank)?;
    let row = state
        .resolver
        .names()
        .set(community_id, rank, query.case, &body.name)
        .await?;
    Ok(Json(row))
}

/// `DELETE /api/communities/{community_id}/rank-names/{rank}?case=`
pub async fn clear_rank_name(
    State(state): State<AppState>,
    Path((community_id, rank)): Path<(i64, i64)>,
    Query(query): Query<CaseQuery>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let rank = parse_rank(rank)?;
    let removed = state
        .resolver
        .names()
        .clear(community_id, rank, query.case)
        .await?;
    Ok(Json(RemovedResponse { removed }))
}

/// `GET /api/communities/{community_id}/hierarchy?actor=&target=&rank=`
///
/// With `rank`, answers whether the actor may give the target that rank.
pub async fn can_modify(
    State(state): State<AppState>,
    Path(community_id): Path<i64>,
    Query(query): Query<HierarchyQuery>,
) -> Result<Json<HierarchyResponse>, ApiError> {
    let rank = query.rank.map(parse_rank).transpose()?;
    let allowed = match rank {
        Some(rank) => {
            state
                .guard
                .can_assign(query.actor, query.target, community_id, rank)
                .await?
        }
        None => {
            state
                .guard
                .can_modify(query.actor, query.target, community_id)
                .await?
        }
    };

    Ok(Json(HierarchyResponse {
        actor: query.actor,
        target: query.target,
        rank,
        allowed,
    }))
}
