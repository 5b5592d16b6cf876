use axum::extract::State;
use serde_json::Value;

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/v2/config - configuration readback without credentials
pub async fn config_get(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(ApiResponse::success(state.config.public_view()))
}
