//! Operation submission and confirmation handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use governor_types::{EvaluationResult, OperationRequest, RollbackTimer};

use crate::api::rest::state::AppState;
use crate::error::ApiResult;

/// Evaluate an operation. Pending verdicts answer `202 Accepted`; allowed and
/// denied verdicts answer `200 OK` with the verdict in the body.
pub async fn submit_operation(
    State(state): State<AppState>,
    Json(request): Json<OperationRequest>,
) -> (StatusCode, Json<EvaluationResult>) {
    let result = state.governor.evaluate(request);
    let status = if result.is_pending() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };
    (status, Json(result))
}

/// Confirm an allowed operation before its rollback deadline
pub async fn confirm_operation(
    State(state): State<AppState>,
    Path(operation_id): Path<String>,
) -> ApiResult<Json<RollbackTimer>> {
    let timer = state.governor.confirm(&operation_id)?;
    Ok(Json(timer))
}
