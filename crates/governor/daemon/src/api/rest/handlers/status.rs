//! Health, status, approval and audit read handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use governor_types::{ApprovalRequest, AuditEntry, GovernorStatus, OperationRecord, SafetyLevel};
use serde::{Deserialize, Serialize};

use crate::api::rest::state::AppState;
use crate::error::ApiResult;

const DEFAULT_AUDIT_LIMIT: usize = 100;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub emergency_stopped: bool,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let emergency_stopped = state.governor.is_emergency_stopped();
    Json(HealthCheckResponse {
        status: if emergency_stopped {
            SafetyLevel::EmergencyStop.as_str().to_string()
        } else {
            "healthy".to_string()
        },
        version: state.version.clone(),
        uptime: state.uptime(),
        emergency_stopped,
    })
}

/// Governor status endpoint
pub async fn governor_status(State(state): State<AppState>) -> Json<GovernorStatus> {
    Json(state.governor.get_status())
}

/// Get an approval request; expired requests read as rejected
pub async fn get_approval(
    State(state): State<AppState>,
    Path(approval_id): Path<String>,
) -> ApiResult<Json<ApprovalRequest>> {
    Ok(Json(state.governor.get_approval(&approval_id)?))
}

/// Audit query parameters
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// Most recent operation records, oldest first
pub async fn audit_trail(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<OperationRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    Json(state.governor.get_audit_trail(limit))
}

/// Most recent audit entries of every kind, oldest first
pub async fn audit_events(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<AuditEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    Json(state.governor.get_audit_entries(limit))
}
