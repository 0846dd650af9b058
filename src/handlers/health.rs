use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
pub async fn root(Extension(state): Extension<AppState>) -> Json<Value> {
    let resources: Vec<&String> = state.registry.iter().map(|(key, _)| key).collect();
    Json(json!({
        "name": "Stockroom API",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "resources": resources,
        "endpoints": {
            "resources": "/api/:resource[/:id], /api/:resource/bulk",
            "forms": "/api/forms/:key",
            "saved_views": "/api/saved-views[/:id]",
            "me": "/api/me/role, /api/me/permissions",
            "dashboard": "/api/dashboard-inventory",
            "admin": "/api/admin/users, /api/admin/table-docs-health",
            "health": "/api/health",
        }
    }))
}

/// GET /api/health
pub async fn health(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.provider().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "error",
                    "error": e.to_string()
                })),
            )
        }
    }
}
