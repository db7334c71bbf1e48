//! API Router configuration

use super::auth::require_admin;
use super::handlers;
use super::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/approvals/:id/factors", post(handlers::submit_factor))
        .route("/emergency-stop", post(handlers::engage_emergency_stop))
        .route("/reset", post(handlers::reset))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let api_routes = Router::new()
        // Health and status
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::governor_status))
        // Operations
        .route("/operations", post(handlers::submit_operation))
        .route("/operations/:id/confirm", post(handlers::confirm_operation))
        // Approvals
        .route("/approvals/:id", get(handlers::get_approval))
        // Audit
        .route("/audit", get(handlers::audit_trail))
        .route("/audit/events", get(handlers::audit_events))
        // Privileged
        .nest("/admin", admin_routes);

    // Build router with middleware
    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use governor_core::{GovernorConfig, SafetyGovernor};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const TOKEN: &str = "s3cret";

    fn app(admin_token: Option<&str>) -> (Router, SafetyGovernor) {
        let (governor, privileged) = SafetyGovernor::new(GovernorConfig::default());
        let state = AppState::new(
            governor.clone(),
            privileged,
            admin_token.map(str::to_string),
        );
        (create_router(state), governor)
    }

    fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn operation(operation_type: &str) -> Value {
        json!({
            "operation_type": operation_type,
            "origin": "scada-7",
            "sector": "energy",
            "resource_request_pct": 5.0,
        })
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let (app, _) = app(None);
        let response = app.oneshot(get("/api/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["emergency_stopped"], false);
    }

    #[tokio::test]
    async fn allowed_operation_answers_ok_and_can_be_confirmed() {
        let (app, _) = app(None);
        let response = app
            .clone()
            .oneshot(post_json("/api/v1/operations", operation("adjust_setpoint"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "ALLOWED");
        let id = body["operation_id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(post_json(
                &format!("/api/v1/operations/{}/confirm", id),
                json!({}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_rollback_is_not_found() {
        let (app, _) = app(None);
        let response = app
            .oneshot(post_json("/api/v1/operations/op-missing/confirm", json!({}), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["code"], "ROLLBACK_NOT_FOUND");
    }

    #[tokio::test]
    async fn high_risk_operation_is_accepted_pending() {
        let (app, _) = app(None);
        let mut request = operation("adjust_setpoint");
        request["high_risk"] = json!(true);

        let response = app
            .oneshot(post_json("/api/v1/operations", request, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = body_json(response).await;
        assert_eq!(body["status"], "PENDING");
        assert!(body["approval_id"].as_str().unwrap().starts_with("apr-"));
    }

    #[tokio::test]
    async fn admin_routes_refuse_without_configured_token() {
        let (app, governor) = app(None);
        let response = app
            .oneshot(post_json(
                "/api/v1/admin/emergency-stop",
                json!({ "reason": "drill", "authorized_by": "ops" }),
                Some(TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!governor.is_emergency_stopped());
    }

    #[tokio::test]
    async fn admin_routes_refuse_wrong_token() {
        let (app, governor) = app(Some(TOKEN));
        let response = app
            .oneshot(post_json(
                "/api/v1/admin/emergency-stop",
                json!({ "reason": "drill", "authorized_by": "ops" }),
                Some("guess"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!governor.is_emergency_stopped());
    }

    #[tokio::test]
    async fn emergency_stop_then_reset() {
        let (app, governor) = app(Some(TOKEN));
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v1/admin/emergency-stop",
                json!({ "reason": "sensor fault", "authorized_by": "ops" }),
                Some(TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(governor.is_emergency_stopped());

        let response = app
            .clone()
            .oneshot(post_json("/api/v1/operations", operation("adjust_setpoint"), None))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["status"], "DENIED");

        let response = app
            .oneshot(post_json(
                "/api/v1/admin/reset",
                json!({ "authorized_by": "ops" }),
                Some(TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!governor.is_emergency_stopped());
    }

    #[tokio::test]
    async fn reset_requires_identity() {
        let (app, _) = app(Some(TOKEN));
        let response = app
            .oneshot(post_json(
                "/api/v1/admin/reset",
                json!({ "authorized_by": "  " }),
                Some(TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn factor_for_unknown_approval_is_not_found() {
        let (app, _) = app(Some(TOKEN));
        let response = app
            .oneshot(post_json(
                "/api/v1/admin/approvals/apr-missing/factors",
                json!({ "factor": "supervisor", "approved": true, "authorized_by": "ops" }),
                Some(TOKEN),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn audit_lists_every_evaluation() {
        let (app, _) = app(None);
        for _ in 0..3 {
            app.clone()
                .oneshot(post_json("/api/v1/operations", operation("adjust_setpoint"), None))
                .await
                .unwrap();
        }

        let response = app.clone().oneshot(get("/api/v1/audit?limit=2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

        let response = app.oneshot(get("/api/v1/audit/events")).await.unwrap();
        let events = body_json(response).await;
        // three evaluations, three armed rollbacks
        assert_eq!(events.as_array().unwrap().len(), 6);
    }
}
