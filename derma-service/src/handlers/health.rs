use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "derma-service",
            "version": env!("CARGO_PKG_VERSION"),
            "classifier": state.analyzer.classifier_name(),
            "explainer_model": state.analyzer.explainer().model(),
            "labels": state.analyzer.labels().len(),
        })),
    )
}

/// Ready once the explainer answers its health probe.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.analyzer.explainer().health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Explainer health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "error": e.to_string()
                })),
            )
        }
    }
}

pub async fn metrics() -> impl IntoResponse {
    crate::services::get_metrics()
}
