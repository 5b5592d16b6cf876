// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::query::QueryError;
use crate::specs::SpecError;
use crate::template::RenderError;

/// HTTP API error with its status code and client-facing JSON body.
///
/// Only authentication and permission failures answer 403. Every other
/// domain failure is a 400 carrying enough context to debug the request.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    InvalidParameters(String),
    ViewNotFound { name: String },
    SchemaNotFound { name: String },
    RenderFailed { name: String, message: String },
    CursorNotFound { arango_message: String },
    ArangoServer { arango_message: String, error_num: i64 },

    // 403 Forbidden
    Unauthorized { message: String },
    MissingRole { required_role: String },

    // 404 Not Found
    PathNotFound { path: String },

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway
    DatabaseUnavailable { arango_message: String },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidParameters(_)
            | ApiError::ViewNotFound { .. }
            | ApiError::SchemaNotFound { .. }
            | ApiError::RenderFailed { .. }
            | ApiError::CursorNotFound { .. }
            | ApiError::ArangoServer { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } | ApiError::MissingRole { .. } => StatusCode::FORBIDDEN,
            ApiError::PathNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DatabaseUnavailable { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Error classification for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidParameters(_) => "INVALID_PARAMETERS",
            ApiError::ViewNotFound { .. } => "VIEW_NOT_FOUND",
            ApiError::SchemaNotFound { .. } => "SCHEMA_NOT_FOUND",
            ApiError::RenderFailed { .. } => "RENDER_ERROR",
            ApiError::CursorNotFound { .. } => "CURSOR_NOT_FOUND",
            ApiError::ArangoServer { .. } => "UPSTREAM_QUERY_ERROR",
            ApiError::Unauthorized { .. } => "AUTH_ERROR",
            ApiError::MissingRole { .. } => "PERMISSION_ERROR",
            ApiError::PathNotFound { .. } => "NOT_FOUND",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::DatabaseUnavailable { .. } => "DATABASE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = match self {
            ApiError::InvalidParameters(message) => json!({ "error": message }),
            ApiError::ViewNotFound { name } => {
                json!({ "error": "View does not exist.", "name": name })
            }
            ApiError::SchemaNotFound { name } => {
                json!({ "error": "Schema does not exist.", "name": name })
            }
            ApiError::RenderFailed { name, message } => json!({
                "error": "Template rendering failed.",
                "name": name,
                "message": message,
            }),
            ApiError::CursorNotFound { arango_message } => json!({
                "error": "Cursor not found.",
                "arango_message": arango_message,
            }),
            ApiError::ArangoServer { arango_message, error_num } => json!({
                "error": "ArangoDB server error.",
                "arango_message": arango_message,
                "arango_error_num": error_num,
            }),
            ApiError::Unauthorized { message } => {
                json!({ "error": "Unauthorized", "message": message })
            }
            ApiError::MissingRole { required_role } => json!({
                "error": "Unauthorized",
                "message": format!("Missing required role '{}'", required_role),
                "required_role": required_role,
            }),
            ApiError::PathNotFound { path } => json!({ "error": "Not found", "path": path }),
            ApiError::PayloadTooLarge(message) => json!({ "error": message }),
            ApiError::InternalServerError(message) => {
                json!({ "error": "Internal server error.", "message": message })
            }
            ApiError::DatabaseUnavailable { arango_message } => json!({
                "error": "Database unavailable.",
                "arango_message": arango_message,
            }),
        };

        body["code"] = json!(self.error_code());
        body
    }
}

// Static constructor methods
impl ApiError {
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        ApiError::InvalidParameters(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingRole { required } => ApiError::MissingRole {
                required_role: required,
            },
            AuthError::Misconfigured(msg) => {
                tracing::error!("Identity provider misconfigured: {}", msg);
                ApiError::internal_server_error("Authentication is not configured")
            }
            AuthError::ServiceUnavailable(msg) => {
                // Fail closed: an unreachable identity service denies the request
                tracing::error!("Identity service unavailable: {}", msg);
                ApiError::Unauthorized {
                    message: "Unable to verify authorization token".to_string(),
                }
            }
            other => ApiError::Unauthorized {
                message: other.to_string(),
            },
        }
    }
}

impl From<SpecError> for ApiError {
    fn from(err: SpecError) -> Self {
        match err {
            SpecError::ViewNotFound(name) => ApiError::ViewNotFound { name },
            SpecError::SchemaNotFound(name) => ApiError::SchemaNotFound { name },
            SpecError::Malformed { name, message } => {
                tracing::error!("Malformed spec {}: {}", name, message);
                ApiError::internal_server_error(format!("Spec '{}' is malformed", name))
            }
            SpecError::Io(e) => {
                tracing::error!("Spec repository I/O error: {}", e);
                ApiError::internal_server_error("Unable to read the spec repository")
            }
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        ApiError::RenderFailed {
            name: err.view,
            message: err.message,
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::CursorNotFound { message } => ApiError::CursorNotFound {
                arango_message: message,
            },
            DatabaseError::Server { message, error_num, .. } => {
                tracing::warn!("ArangoDB rejected request ({}): {}", error_num, message);
                ApiError::ArangoServer {
                    arango_message: message,
                    error_num,
                }
            }
            DatabaseError::Unavailable(msg) | DatabaseError::InvalidResponse(msg) => {
                tracing::error!("ArangoDB unavailable: {}", msg);
                ApiError::DatabaseUnavailable { arango_message: msg }
            }
            DatabaseError::InvalidUrl(msg) => {
                tracing::error!("Invalid ArangoDB URL: {}", msg);
                ApiError::internal_server_error("Database connection is misconfigured")
            }
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidParameters(msg) => ApiError::InvalidParameters(msg),
            QueryError::Auth(e) => e.into(),
            QueryError::Spec(e) => e.into(),
            QueryError::Render(e) => e.into(),
            QueryError::Database(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json()["error"].as_str().unwrap_or("error"))
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
