use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::app::AppState;
use crate::auth::CallerIdentity;
use crate::middleware::{ApiQuery, ApiResponse, ApiResult};

use super::parse_flag;

#[derive(Debug, Deserialize)]
pub struct SpecsUpdateQuery {
    /// Create a collection for every schema that has none yet
    pub init_collections: Option<String>,
}

/// PUT /api/v2/specs - re-read and validate the spec checkout, optionally creating collections
pub async fn put(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    ApiQuery(query): ApiQuery<SpecsUpdateQuery>,
) -> ApiResult<Value> {
    state.auth.require_admin(&caller)?;

    let views = state.specs.view_names().await?;
    let schemas = state.specs.schemas().await?;

    let mut created = Vec::new();
    if parse_flag(query.init_collections.as_deref()) {
        for schema in &schemas {
            if state.database.ensure_collection(&schema.name, schema.kind).await? {
                created.push(schema.name.clone());
            }
        }
    }

    info!(
        "Specs reloaded by {:?}: {} view(s), {} schema(s), {} collection(s) created",
        caller.user,
        views.len(),
        schemas.len(),
        created.len()
    );

    Ok(ApiResponse::success(json!({
        "status": "updated",
        "views": views.len(),
        "schemas": schemas.len(),
        "collections_created": created,
    })))
}
