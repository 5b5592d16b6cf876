//! Graph database seam.
//!
//! The relay never owns cursor state: it starts a query or advances a cursor
//! by id and hands back whatever page the database produced.

pub mod arango;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::BindVars;

pub use arango::ArangoClient;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Cursor not found: {message}")]
    CursorNotFound { message: String },

    #[error("ArangoDB error {error_num} (HTTP {code}): {message}")]
    Server {
        code: u16,
        error_num: i64,
        message: String,
    },

    #[error("ArangoDB unreachable: {0}")]
    Unavailable(String),

    #[error("Unexpected ArangoDB response: {0}")]
    InvalidResponse(String),

    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),
}

/// One batch of results as the database reports it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorPage {
    pub result: Vec<Value>,
    pub has_more: bool,
    pub id: Option<String>,
    /// Total number of matches, when the database was asked to count
    pub count: Option<u64>,
    pub stats: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Vertex,
    Edge,
}

impl CollectionKind {
    /// ArangoDB collection type code: 2 for documents, 3 for edges
    pub fn arango_type(self) -> u8 {
        match self {
            CollectionKind::Vertex => 2,
            CollectionKind::Edge => 3,
        }
    }
}

/// What a bulk import does when a document key already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDuplicate {
    #[default]
    Error,
    Update,
    Replace,
    Ignore,
}

impl OnDuplicate {
    pub fn as_str(self) -> &'static str {
        match self {
            OnDuplicate::Error => "error",
            OnDuplicate::Update => "update",
            OnDuplicate::Replace => "replace",
            OnDuplicate::Ignore => "ignore",
        }
    }
}

impl std::str::FromStr for OnDuplicate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(OnDuplicate::Error),
            "update" => Ok(OnDuplicate::Update),
            "replace" => Ok(OnDuplicate::Replace),
            "ignore" => Ok(OnDuplicate::Ignore),
            other => Err(format!(
                "Invalid on_duplicate '{}': expected error, update, replace or ignore",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub on_duplicate: OnDuplicate,
    /// Truncate the collection before importing
    pub overwrite: bool,
    /// Ask the database for per-document error details
    pub details: bool,
}

#[async_trait]
pub trait GraphDatabase: Send + Sync {
    /// Start a query; the first page comes back with the cursor id when more remain.
    async fn start_query(
        &self,
        query: &str,
        bind_vars: &BindVars,
        batch_size: u32,
    ) -> Result<CursorPage, DatabaseError>;

    /// Fetch the next page of an open cursor.
    async fn next_page(&self, cursor_id: &str) -> Result<CursorPage, DatabaseError>;

    /// Create the collection unless it exists. Returns true when it was created.
    async fn ensure_collection(
        &self,
        name: &str,
        kind: CollectionKind,
    ) -> Result<bool, DatabaseError>;

    /// Bulk import documents, returning the database's import report.
    async fn import_documents(
        &self,
        collection: &str,
        documents: &[Value],
        options: &ImportOptions,
    ) -> Result<Value, DatabaseError>;

    async fn server_version(&self) -> Result<String, DatabaseError>;
}
