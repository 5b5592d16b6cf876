use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

/// GET / - service status
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let (arango_conn, arango_version) = match state.database.server_version().await {
        Ok(version) => ("connected", Some(version)),
        Err(e) => {
            tracing::warn!("ArangoDB status check failed: {}", e);
            ("unreachable", None)
        }
    };

    Json(json!({
        "name": "Relation Engine API",
        "version": env!("CARGO_PKG_VERSION"),
        "arango_conn": arango_conn,
        "arango_version": arango_version,
        "spec_repo_url": state.config.specs.repo_url,
        "server_time": chrono::Utc::now(),
        "endpoints": {
            "query_results": "POST /api/v2/query_results (view / cursor_id public, query admin)",
            "specs":
                "GET /api/v2/specs/schemas, GET /api/v2/specs/views, PUT /api/v2/specs (admin)",
            "documents": "PUT /api/v2/documents (admin)",
            "config": "GET /api/v2/config",
        }
    }))
}

/// GET /health - 200 when the database answers
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.database.server_version().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database_error": e.to_string()
            })),
        ),
    }
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::PathNotFound {
        path: uri.path().to_string(),
    }
}
