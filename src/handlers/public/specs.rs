use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiQuery, ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SpecQuery {
    /// Return this one spec instead of the list of names
    pub name: Option<String>,
}

/// GET /api/v2/specs/schemas - schema names, or one schema with ?name=
pub async fn schemas_get(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SpecQuery>,
) -> ApiResult<Value> {
    if let Some(name) = query.name {
        let schema = state.specs.schema(&name).await?;
        let data = serde_json::to_value(schema)
            .map_err(|e| ApiError::internal_server_error(e.to_string()))?;
        return Ok(ApiResponse::success(data));
    }

    let names: Vec<String> =
        state.specs.schemas().await?.into_iter().map(|s| s.name).collect();
    Ok(ApiResponse::success(json!(names)))
}

/// GET /api/v2/specs/views - view names, or one view's source with ?name=
pub async fn views_get(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SpecQuery>,
) -> ApiResult<Value> {
    if let Some(name) = query.name {
        let view = state.specs.view(&name).await?;
        return Ok(ApiResponse::success(json!({
            "name": view.name,
            "source": view.template_source,
        })));
    }

    let names = state.specs.view_names().await?;
    Ok(ApiResponse::success(json!(names)))
}
