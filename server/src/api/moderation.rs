//! Moderation API
//!
//! Restrictions, warnings and the global denylist.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::ranks::RemovedResponse;
use crate::api::{ApiError, AppState};
use crate::db::{DenylistRow, RestrictionKind, RestrictionRow};
use crate::moderation::RestrictionStatus;
use crate::permissions::ANTISPAM;

// ============================================================================
// Types
// ============================================================================

/// Expiry given either as an instant or as seconds from now. Neither means permanent.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ExpirySpec {
    pub until: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "duration_secs must be positive"))]
    pub duration_secs: Option<i64>,
}

impl ExpirySpec {
    fn resolve(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, ApiError> {
        match (self.until, self.duration_secs) {
            (Some(_), Some(_)) => Err(ApiError::validation(
                "give either until or duration_secs, not both",
            )),
            (Some(until), None) => Ok(Some(until)),
            (None, Some(secs)) => Duration::try_seconds(secs)
                .and_then(|d| now.checked_add_signed(d))
                .map(Some)
                .ok_or_else(|| ApiError::validation("duration_secs is too large")),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetRestrictionRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub expiry: ExpirySpec,
}

#[derive(Debug, Serialize)]
pub struct RestrictionStatusResponse {
    pub restricted: bool,
    #[serde(flatten)]
    pub status: RestrictionStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddWarningRequest {
    #[validate(length(max = 500, message = "reason is too long"))]
    pub reason: Option<String>,
    #[serde(flatten)]
    #[validate(nested)]
    pub expiry: ExpirySpec,
}

#[derive(Debug, Serialize)]
pub struct AddWarningResponse {
    pub active_count: usize,
}

/// Active warning with its current 1-based position.
#[derive(Debug, Serialize)]
pub struct WarningView {
    pub position: usize,
    pub reason: String,
    pub issued_at: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub removed: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DenylistRequest {
    #[validate(length(max = 500, message = "reason is too long"))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DenylistResponse {
    pub identity_id: i64,
    pub denylisted: bool,
}

#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    pub identity_id: i64,
    /// `false` when the community switched the antispam module off.
    pub enforced: bool,
    pub denylisted: bool,
}

fn parse_kind(kind: &str) -> Result<RestrictionKind, ApiError> {
    kind.parse().map_err(ApiError::Validation)
}

// ============================================================================
// Restrictions
// ============================================================================

/// `GET /api/communities/{community_id}/restrictions/{kind}/{identity_id}`
///
/// Never fails on store errors: an unreachable store reports `restricted`.
pub async fn restriction_status(
    State(state): State<AppState>,
    Path((community_id, kind, identity_id)): Path<(i64, String, i64)>,
) -> Result<Json<RestrictionStatusResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let status = state
        .restrictions
        .status(kind, community_id, identity_id)
        .await;

    Ok(Json(RestrictionStatusResponse {
        restricted: status.blocks(),
        status,
    }))
}

/// `PUT /api/communities/{community_id}/restrictions/{kind}/{identity_id}`
pub async fn set_restriction(
    State(state): State<AppState>,
    Path((community_id, kind, identity_id)): Path<(i64, String, i64)>,
    Json(body): Json<SetRestrictionRequest>,
) -> Result<Json<RestrictionRow>, ApiError> {
    body.validate()?;
    let kind = parse_kind(&kind)?;
    let until = body.expiry.resolve(Utc::now())?;

    let row = state
        .restrictions
        .set(kind, community_id, identity_id, until)
        .await?;
    Ok(Json(row))
}

/// `DELETE /api/communities/{community_id}/restrictions/{kind}/{identity_id}`
pub async fn clear_restriction(
    State(state): State<AppState>,
    Path((community_id, kind, identity_id)): Path<(i64, String, i64)>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let removed = state
        .restrictions
        .clear(kind, community_id, identity_id)
        .await?;
    Ok(Json(RemovedResponse { removed }))
}

// ============================================================================
// Warnings
// ============================================================================

/// `GET /api/communities/{community_id}/members/{identity_id}/warnings`
pub async fn list_warnings(
    State(state): State<AppState>,
    Path((community_id, identity_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<WarningView>>, ApiError> {
    let warnings = state
        .warnings
        .list_active(community_id, identity_id)
        .await?
        .into_iter()
        .enumerate()
        .map(|(i, w)| WarningView {
            position: i + 1,
            reason: w.reason,
            issued_at: w.issued_at,
            until: w.until,
        })
        .collect();

    Ok(Json(warnings))
}

/// `POST /api/communities/{community_id}/members/{identity_id}/warnings`
pub async fn add_warning(
    State(state): State<AppState>,
    Path((community_id, identity_id)): Path<(i64, i64)>,
    Json(body): Json<AddWarningRequest>,
) -> Result<Json<AddWarningResponse>, ApiError> {
    body.validate()?;
    let until = body.expiry.resolve(Utc::now())?;

    let active_count = state
        .warnings
        .add(community_id, identity_id, body.reason.as_deref(), until)
        .await?;
    Ok(Json(AddWarningResponse { active_count }))
}

/// `DELETE /api/communities/{community_id}/members/{identity_id}/warnings`
pub async fn clear_warnings(
    State(state): State<AppState>,
    Path((community_id, identity_id)): Path<(i64, i64)>,
) -> Result<Json<ClearedResponse>, ApiError> {
    let removed = state.warnings.clear_all(community_id, identity_id).await?;
    Ok(Json(ClearedResponse { removed }))
}

/// `DELETE /api/communities/{community_id}/members/{identity_id}/warnings/latest`
pub async fn remove_latest_warning(
    State(state): State<AppState>,
    Path((community_id, identity_id)): Path<(i64, i64)>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state
        .warnings
        .remove_latest(community_id, identity_id)
        .await?;
    Ok(Json(RemovedResponse { removed }))
}

/// `DELETE /api/communities/{community_id}/members/{identity_id}/warnings/{position}`
pub async fn remove_warning_at(
    State(state): State<AppState>,
    Path((community_id, identity_id, position)): Path<(i64, i64, usize)>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state
        .warnings
        .remove_at(community_id, identity_id, position)
        .await?;
    Ok(Json(RemovedResponse { removed }))
}

// ============================================================================
// Denylist
// ============================================================================

/// `GET /api/denylist/{identity_id}`
pub async fn denylist_contains(
    State(state): State<AppState>,
    Path(identity_id): Path<i64>,
) -> Result<Json<DenylistResponse>, ApiError> {
    let denylisted = state.denylist.contains(identity_id).await?;
    Ok(Json(DenylistResponse {
        identity_id,
        denylisted,
    }))
}

/// `GET /api/communities/{community_id}/denylist/{identity_id}`
///
/// Denylist check for a member joining or posting. Skipped entirely when the
/// community disabled the antispam module.
pub async fn screen_member(
    State(state): State<AppState>,
    Path((community_id, identity_id)): Path<(i64, i64)>,
) -> Result<Json<ScreenResponse>, ApiError> {
    if !state.modules.is_enabled(community_id, ANTISPAM).await? {
        return Ok(Json(ScreenResponse {
            identity_id,
            enforced: false,
            denylisted: false,
        }));
    }

    let denylisted = state.denylist.contains(identity_id).await?;
    Ok(Json(ScreenResponse {
        identity_id,
        enforced: true,
        denylisted,
    }))
}

/// `PUT /api/denylist/{identity_id}`
pub async fn denylist_add(
    State(state): State<AppState>,
    Path(identity_id): Path<i64>,
    Json(body): Json<DenylistRequest>,
) -> Result<Json<DenylistRow>, ApiError> {
    body.validate()?;
    let row = state
        .denylist
        .add(identity_id, body.reason.as_deref())
        .await?;
    Ok(Json(row))
}

/// `DELETE /api/denylist/{identity_id}`
pub async fn denylist_remove(
    State(state): State<AppState>,
    Path(identity_id): Path<i64>,
) -> Result<Json<RemovedResponse>, ApiError> {
    let removed = state.denylist.remove(identity_id).await?;
    Ok(Json(RemovedResponse { removed }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_from_duration() {
        let now = Utc::now();
        let spec = ExpirySpec {
            until: None,
            duration_secs: Some(600),
        };
        assert_eq!(spec.resolve(now).unwrap(), Some(now + Duration::seconds(600)));
    }

    #[test]
    fn test_expiry_rejects_both_forms() {
        let now = Utc::now();
        let spec = ExpirySpec {
            until: Some(now),
            duration_secs: Some(60),
        };
        assert!(spec.resolve(now).is_err());
    }

    #[test]
    fn test_no_expiry_is_permanent() {
        assert_eq!(ExpirySpec::default().resolve(Utc::now()).unwrap(), None);
    }

    #[test]
    fn test_flattened_expiry_deserializes() {
        let body: AddWarningRequest =
            serde_json::from_str(r#"{"reason":"flood","duration_secs":3600}"#).unwrap();
        assert_eq!(body.expiry.duration_secs, Some(3600));
        assert!(body.validate().is_ok());

        let body: AddWarningRequest = serde_json::from_str(r#"{"duration_secs":0}"#).unwrap();
        assert!(body.validate().is_err());
    }
}
