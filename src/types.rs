/// Shared types used across the codebase

use serde_json::{Map, Value};

/// Identifier of a resource (workspace) a caller may be granted read access to
pub type ResourceId = i64;

/// Named query parameters substituted by the database at execution time
pub type BindVars = Map<String, Value>;

/// Variables handed to a view template when it is rendered into query text
pub type TemplateVars = Map<String, Value>;
