//! Privileged handlers: approval factors, emergency stop, reset

use axum::{
    extract::{Path, State},
    Json,
};
use governor_core::FactorOutcome;
use governor_types::{ResetRecord, StopRecord};
use serde::Deserialize;

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};

/// Factor submission request
#[derive(Debug, Deserialize)]
pub struct FactorSubmission {
    pub factor: String,
    pub approved: bool,
    pub authorized_by: String,
}

/// Emergency stop request
#[derive(Debug, Deserialize)]
pub struct EmergencyStopRequest {
    pub reason: String,
    pub authorized_by: String,
}

/// Reset request
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub authorized_by: String,
}

/// Submit one approval factor
pub async fn submit_factor(
    State(state): State<AppState>,
    Path(approval_id): Path<String>,
    Json(submission): Json<FactorSubmission>,
) -> ApiResult<Json<FactorOutcome>> {
    require_identity(&submission.authorized_by)?;
    let outcome = state.privileged.submit_factor(
        &approval_id,
        &submission.factor,
        submission.approved,
        &submission.authorized_by,
    )?;
    Ok(Json(outcome))
}

/// Engage the emergency stop
pub async fn engage_emergency_stop(
    State(state): State<AppState>,
    Json(request): Json<EmergencyStopRequest>,
) -> ApiResult<Json<StopRecord>> {
    require_identity(&request.authorized_by)?;
    if request.reason.trim().is_empty() {
        return Err(ApiError::BadRequest("reason is required".to_string()));
    }
    Ok(Json(
        state
            .privileged
            .engage_emergency_stop(&request.reason, &request.authorized_by),
    ))
}

/// Reset the governor to OPERATIONAL
pub async fn reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> ApiResult<Json<ResetRecord>> {
    require_identity(&request.authorized_by)?;
    Ok(Json(state.privileged.reset(&request.authorized_by)))
}

fn require_identity(authorized_by: &str) -> ApiResult<()> {
    if authorized_by.trim().is_empty() {
        return Err(ApiError::BadRequest("authorized_by is required".to_string()));
    }
    Ok(())
}
