use axum::{
    extract::{Extension, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::auth::CallerIdentity;
use crate::database::{ImportOptions, OnDuplicate};
use crate::error::ApiError;
use crate::middleware::{ApiBody, ApiQuery, ApiResponse, ApiResult};

use super::parse_flag;

#[derive(Debug, Deserialize)]
pub struct DocumentsQuery {
    pub collection: Option<String>,
    pub on_duplicate: Option<String>,
    pub overwrite: Option<String>,
    pub display_errors: Option<String>,
}

/// PUT /api/v2/documents - bulk write newline-delimited JSON documents into a collection
pub async fn put(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    ApiQuery(query): ApiQuery<DocumentsQuery>,
    ApiBody(body): ApiBody,
) -> ApiResult<Value> {
    state.auth.require_admin(&caller)?;

    let collection = query
        .collection
        .ok_or_else(|| ApiError::invalid_parameters("Missing required parameter: collection"))?;
    // Only collections described by a schema may be written
    state.specs.schema(&collection).await?;

    let on_duplicate = match query.on_duplicate.as_deref() {
        Some(raw) => raw.parse::<OnDuplicate>().map_err(ApiError::invalid_parameters)?,
        None => OnDuplicate::default(),
    };
    let display_errors = parse_flag(query.display_errors.as_deref());
    let options = ImportOptions {
        on_duplicate,
        overwrite: parse_flag(query.overwrite.as_deref()),
        details: display_errors,
    };

    let documents = parse_documents(&body)?;
    let mut report = state
        .database
        .import_documents(&collection, &documents, &options)
        .await?;

    if !display_errors {
        if let Some(report) = report.as_object_mut() {
            report.remove("details");
        }
    }

    Ok(ApiResponse::with_status(report, StatusCode::CREATED))
}

/// One JSON object per line; blank lines are skipped.
fn parse_documents(body: &[u8]) -> Result<Vec<Value>, ApiError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| ApiError::invalid_parameters("Request body must be UTF-8"))?;

    let mut documents = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let doc: Value = serde_json::from_str(line).map_err(|e| {
            ApiError::invalid_parameters(format!(
                "Invalid JSON document on line {}: {}",
                index + 1,
                e
            ))
        })?;
        if !doc.is_object() {
            return Err(ApiError::invalid_parameters(format!(
                "Document on line {} must be a JSON object",
                index + 1
            )));
        }
        documents.push(doc);
    }

    if documents.is_empty() {
        return Err(ApiError::invalid_parameters("No documents provided"));
    }
    Ok(documents)
}
