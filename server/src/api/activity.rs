//! Activity API.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::{ApiError, AppState};
use crate::db::{ActivityRow, DailyActivityRow};

#[derive(Debug, Serialize)]
pub struct MarkResponse {
    /// Whether this event caused a durable write.
    pub flushed: bool,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub seen: Option<ActivityRow>,
    pub days: Vec<DailyActivityRow>,
}

/// `POST /api/activity/{identity_id}`
pub async fn mark_active(
    State(state): State<AppState>,
    Path(identity_id): Path<i64>,
) -> Result<Json<MarkResponse>, ApiError> {
    let flushed = state.activity.mark_active(identity_id).await?;
    Ok(Json(MarkResponse { flushed }))
}

/// `GET /api/activity/{identity_id}`
pub async fn get_activity(
    State(state): State<AppState>,
    Path(identity_id): Path<i64>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let (seen, days) = state.activity.summary(identity_id).await?;
    Ok(Json(ActivityResponse { seen, days }))
}
