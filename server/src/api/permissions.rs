//! Permission threshold and feature module API.

use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::{ApiError, AppState};
use crate::permissions::{ModerationAction, PermissionError, Threshold};
use crate::ranks::Rank;

#[derive(Debug, Deserialize)]
pub struct DefaultQuery {
    /// Static default for actions the server does not know.
    pub default: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetOverrideRequest {
    #[validate(range(min = 0, max = 5, message = "min_rank must be between 0 and 5"))]
    pub min_rank: i64,
}

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub actor: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub action: ModerationAction,
    pub actor: i64,
    pub actor_rank: Rank,
    pub allowed: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetModuleRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ModuleResponse {
    pub module: String,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct RequiredRankResponse {
    pub action: String,
    pub min_rank: Rank,
}

/// `GET /api/communities/{community_id}/permissions`
pub async fn list_thresholds(
    State(state): State<AppState>,
    Path(community_id): Path<i64>,
) -> Result<Json<Vec<Threshold>>, ApiError> {
    Ok(Json(state.permissions.thresholds(community_id).await?))
}

/// `GET /api/communities/{community_id}/permissions/{action}?default=`
///
/// Without `default`, the action must be a known one.
pub async fn required_rank(
    State(state): State<AppState>,
    Path((community_id, action)): Path<(i64, String)>,
    Query(query): Query<DefaultQuery>,
) -> Result<Json<RequiredRankResponse>, ApiError> {
    let static_default = match query.default {
        Some(level) => Rank::from_level(level).map_err(|_| PermissionError::InvalidThreshold(level))?,
        None => action
            .parse::<ModerationAction>()
            .map_err(|_| PermissionError::UnknownAction(action.clone()))?
            .default_rank(),
    };

    let min_rank = state
        .permissions
        .required_rank(community_id, &action, static_default)
        .await?;

    Ok(Json(RequiredRankResponse { action, min_rank }))
}

/// `GET /api/communities/{community_id}/permissions/{action}/check?actor=`
///
/// Resolves the actor's effective rank and compares it to the threshold.
pub async fn check_action(
    State(state): State<AppState>,
    Path((community_id, action)): Path<(i64, String)>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckResponse>, ApiError> {
    let action: ModerationAction = action
        .parse()
        .map_err(|_| PermissionError::UnknownAction(action.clone()))?;

    let actor = state.resolver.resolve(query.actor, community_id).await?;
    let allowed = state
        .permissions
        .permits(community_id, action, actor.rank)
        .await?;

    Ok(Json(CheckResponse {
        action,
        actor: query.actor,
        actor_rank: actor.rank,
        allowed,
    }))
}

/// `PUT /api/communities/{community_id}/permissions/{action}`
pub async fn set_override(
    State(state): State<AppState>,
    Path((community_id, action)): Path<(i64, String)>,
    Json(body): Json<SetOverrideRequest>,
) -> Result<Json<RequiredRankResponse>, ApiError> {
    body.validate()?;
    let min_rank = state
        .permissions
        .set_override(community_id, &action, body.min_rank)
        .await?;

    Ok(Json(RequiredRankResponse { action, min_rank }))
}

/// `GET /api/communities/{community_id}/modules`
pub async fn list_disabled_modules(
    State(state): State<AppState>,
    Path(community_id): Path<i64>,
) -> Result<Json<BTreeSet<String>>, ApiError> {
    Ok(Json(state.modules.disabled(community_id).await?))
}

/// `PUT /api/communities/{community_id}/modules/{module}`
pub async fn set_module(
    State(state): State<AppState>,
    Path((community_id, module)): Path<(i64, String)>,
    Json(body): Json<SetModuleRequest>,
) -> Result<Json<ModuleResponse>, ApiError> {
    state
        .modules
        .set_enabled(community_id, &module, body.enabled)
        .await?;

    Ok(Json(ModuleResponse {
        module,
        enabled: body.enabled,
    }))
}
