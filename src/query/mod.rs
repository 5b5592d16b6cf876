//! Query dispatch: pick the request shape, scope the bind variables to the
//! caller, make exactly one database call and shape the page.

pub mod pagination;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::auth::{AuthError, AuthGateway, CallerIdentity};
use crate::config::QueryConfig;
use crate::database::{DatabaseError, GraphDatabase};
use crate::specs::{SpecError, SpecRepository};
use crate::template::{RenderError, ViewRenderer};
use crate::types::{BindVars, TemplateVars};

pub use pagination::ResultPage;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// The three ways a query request can be answered
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTarget {
    /// Free-form query, administrators only. Held as sent until the role check passes.
    Adhoc { query: Value },
    /// Stored view rendered from the spec repository
    View { name: String },
    /// Next page of an open cursor
    Cursor { id: String },
}

impl QueryTarget {
    /// Ad-hoc text wins over a view, a view wins over a cursor.
    pub fn select(
        query: Option<Value>,
        view: Option<String>,
        cursor_id: Option<String>,
    ) -> Result<Self, QueryError> {
        match (query, view, cursor_id) {
            (Some(query), _, _) => Ok(QueryTarget::Adhoc { query }),
            (None, Some(name), _) => Ok(QueryTarget::View { name }),
            (None, None, Some(id)) => Ok(QueryTarget::Cursor { id }),
            (None, None, None) => Err(QueryError::InvalidParameters(
                "Pass in a view or a cursor_id".to_string(),
            )),
        }
    }
}

/// JSON body of `POST query_results`. An empty body is the same as `{}`.
#[derive(Debug, Default, Deserialize)]
pub struct QueryBody {
    /// `Some` whenever the key is present, including an explicit null
    #[serde(default, deserialize_with = "present")]
    pub query: Option<Value>,
    pub bind_vars: Option<BindVars>,
    pub template_vars: Option<TemplateVars>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl QueryBody {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, QueryError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes)
            .map_err(|e| QueryError::InvalidParameters(format!("Unable to parse JSON body: {}", e)))
    }
}

/// Query-string parameters of `POST query_results`
#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    pub view: Option<String>,
    pub cursor_id: Option<String>,
    pub batch_size: Option<String>,
}

/// Everything the dispatcher needs from one request
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub target: QueryTarget,
    pub bind_vars: BindVars,
    pub template_vars: TemplateVars,
    pub batch_size: u32,
}

impl QueryRequest {
    pub fn from_parts(
        body: QueryBody,
        params: QueryParams,
        settings: &QueryConfig,
    ) -> Result<Self, QueryError> {
        let batch_size = parse_batch_size(params.batch_size.as_deref(), settings)?;
        let target = QueryTarget::select(body.query, params.view, params.cursor_id)?;

        Ok(Self {
            target,
            bind_vars: body.bind_vars.unwrap_or_default(),
            template_vars: body.template_vars.unwrap_or_default(),
            batch_size,
        })
    }
}

fn parse_batch_size(raw: Option<&str>, settings: &QueryConfig) -> Result<u32, QueryError> {
    let size = match raw {
        None => settings.default_batch_size,
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| {
                QueryError::InvalidParameters(format!(
                    "batch_size must be a positive integer, got '{}'",
                    raw
                ))
            })?,
    };
    Ok(size.min(settings.max_batch_size))
}

/// Overwrite the authorized-ids bind variable with the server's resolution
/// for this caller.
pub fn scope_bind_vars(bind_vars: &mut BindVars, key: &str, caller: &CallerIdentity) {
    let ids = caller
        .authorized_resource_ids
        .iter()
        .map(|id| Value::from(*id))
        .collect();
    bind_vars.insert(key.to_string(), Value::Array(ids));
}

pub struct QueryDispatcher<'a> {
    auth: &'a AuthGateway,
    specs: &'a dyn SpecRepository,
    renderer: &'a ViewRenderer,
    database: &'a dyn GraphDatabase,
    authorized_ids_key: &'a str,
}

impl<'a> QueryDispatcher<'a> {
    pub fn new(
        auth: &'a AuthGateway,
        specs: &'a dyn SpecRepository,
        renderer: &'a ViewRenderer,
        database: &'a dyn GraphDatabase,
        authorized_ids_key: &'a str,
    ) -> Self {
        Self {
            auth,
            specs,
            renderer,
            database,
            authorized_ids_key,
        }
    }

    pub async fn dispatch(
        &self,
        request: QueryRequest,
        caller: &CallerIdentity,
    ) -> Result<ResultPage, QueryError> {
        let QueryRequest {
            target,
            mut bind_vars,
            template_vars,
            batch_size,
        } = request;

        let page = match target {
            QueryTarget::Adhoc { query } => {
                self.auth.require_admin(caller)?;
                let Value::String(query) = query else {
                    return Err(QueryError::InvalidParameters(
                        "query must be a string of AQL".to_string(),
                    ));
                };
                scope_bind_vars(&mut bind_vars, self.authorized_ids_key, caller);
                info!("Running ad-hoc query for {:?}", caller.user);
                self.database.start_query(&query, &bind_vars, batch_size).await?
            }
            QueryTarget::View { name } => {
                let view = self.specs.view(&name).await?;
                let query = self.renderer.render(&view, &template_vars).await?;
                scope_bind_vars(&mut bind_vars, self.authorized_ids_key, caller);
                info!("Running view {} (batch size {})", name, batch_size);
                self.database.start_query(&query, &bind_vars, batch_size).await?
            }
            QueryTarget::Cursor { id } => self.database.next_page(&id).await?,
        };

        Ok(page.into())
    }
}
