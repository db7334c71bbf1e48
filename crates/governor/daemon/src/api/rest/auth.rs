//! Bearer-token guard for the privileged routes

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};

/// Reject requests without the configured admin bearer token.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let Some(expected) = state.admin_token.as_deref() else {
        tracing::warn!(uri = %request.uri(), "Admin call refused: no admin token configured");
        return Err(ApiError::Unauthorized(
            "admin API disabled: no token configured".to_string(),
        ));
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match presented {
        Some(token) if token_matches(token, expected) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(uri = %request.uri(), "Admin call refused: wrong token");
            Err(ApiError::Unauthorized("invalid admin token".to_string()))
        }
        None => Err(ApiError::Unauthorized("missing bearer token".to_string())),
    }
}

/// Constant-time comparison over the full token (no early exit on mismatch).
fn token_matches(presented: &str, expected: &str) -> bool {
    let (presented, expected) = (presented.as_bytes(), expected.as_bytes());
    let mut diff = presented.len() ^ expected.len();
    for (i, byte) in expected.iter().enumerate() {
        let other = presented.get(i).copied().unwrap_or(0);
        diff |= usize::from(byte ^ other);
    }
    diff == 0
}
