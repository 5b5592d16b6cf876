//! Spec repository: stored views (query templates) and collection schemas.

pub mod fs;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::database::CollectionKind;

pub use fs::FsSpecRepository;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("View does not exist: {0}")]
    ViewNotFound(String),

    #[error("Schema does not exist: {0}")]
    SchemaNotFound(String),

    #[error("Malformed spec '{name}': {message}")]
    Malformed { name: String, message: String },

    #[error("Spec repository I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewDefinition {
    pub name: String,
    pub template_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CollectionKind,
    #[serde(default)]
    pub schema: Value,
}

/// Source of views and schemas. Implementations read fresh on every call.
#[async_trait]
pub trait SpecRepository: Send + Sync {
    async fn view(&self, name: &str) -> Result<ViewDefinition, SpecError>;

    async fn view_names(&self) -> Result<Vec<String>, SpecError>;

    async fn schema(&self, name: &str) -> Result<SchemaDefinition, SpecError>;

    async fn schemas(&self) -> Result<Vec<SchemaDefinition>, SpecError>;
}

/// Spec names double as file stems, so anything that could walk the filesystem is refused.
pub fn is_valid_spec_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
