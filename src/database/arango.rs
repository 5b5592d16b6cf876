use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

use super::{CollectionKind, CursorPage, DatabaseError, GraphDatabase, ImportOptions};
use crate::config::ArangoConfig;
use crate::types::BindVars;

/// errorNum ArangoDB reports for an unknown or expired cursor
const ERROR_CURSOR_NOT_FOUND: i64 = 1600;

/// ArangoDB over its HTTP API, scoped to one database
pub struct ArangoClient {
    http: Client,
    db_url: Url,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorResponse {
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    id: Option<String>,
    count: Option<u64>,
    extra: Option<CursorExtra>,
}

#[derive(Debug, Deserialize)]
struct CursorExtra {
    stats: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArangoErrorBody {
    error_message: Option<String>,
    error_num: Option<i64>,
    code: Option<u16>,
}

impl From<CursorResponse> for CursorPage {
    fn from(resp: CursorResponse) -> Self {
        Self {
            result: resp.result,
            has_more: resp.has_more,
            id: resp.id,
            count: resp.count,
            stats: resp.extra.and_then(|extra| extra.stats),
        }
    }
}

impl ArangoClient {
    pub fn new(config: &ArangoConfig) -> Result<Self, DatabaseError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DatabaseError::Unavailable(format!("failed to build HTTP client: {}", e))
            })?;

        Self::with_client(http, config)
    }

    pub fn with_client(http: Client, config: &ArangoConfig) -> Result<Self, DatabaseError> {
        let db_url = Self::build_db_url(&config.url, &config.database)?;

        Ok(Self {
            http,
            db_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// `<server>/_db/<database>/`, keeping any path prefix the server URL carries
    fn build_db_url(base: &str, database: &str) -> Result<Url, DatabaseError> {
        let mut url = Url::parse(base)
            .map_err(|e| DatabaseError::InvalidUrl(format!("{}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| DatabaseError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .push("_db")
            .push(database)
            .push("");
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, DatabaseError> {
        let mut url = self.db_url.clone();
        url.path_segments_mut()
            .map_err(|_| DatabaseError::InvalidUrl(self.db_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, DatabaseError> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| DatabaseError::Unavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DatabaseError::Unavailable(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&text)
                .map_err(|e| DatabaseError::InvalidResponse(e.to_string()));
        }

        Err(server_error(status, &text))
    }

    async fn send_cursor(&self, request: RequestBuilder) -> Result<CursorPage, DatabaseError> {
        let body = self.send(request).await?;
        let cursor: CursorResponse = serde_json::from_value(body)
            .map_err(|e| DatabaseError::InvalidResponse(e.to_string()))?;
        Ok(cursor.into())
    }
}

fn server_error(status: StatusCode, text: &str) -> DatabaseError {
    match serde_json::from_str::<ArangoErrorBody>(text) {
        Ok(body) => DatabaseError::Server {
            code: body.code.unwrap_or(status.as_u16()),
            error_num: body.error_num.unwrap_or(0),
            message: body.error_message.unwrap_or_else(|| text.to_string()),
        },
        Err(_) => DatabaseError::Server {
            code: status.as_u16(),
            error_num: 0,
            message: if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                text.to_string()
            },
        },
    }
}

#[async_trait]
impl GraphDatabase for ArangoClient {
    async fn start_query(
        &self,
        query: &str,
        bind_vars: &BindVars,
        batch_size: u32,
    ) -> Result<CursorPage, DatabaseError> {
        let url = self.endpoint(&["_api", "cursor"])?;
        let body = json!({
            "query": query,
            "bindVars": bind_vars,
            "batchSize": batch_size,
            "count": true,
        });

        debug!("Starting AQL query (batch size {})", batch_size);
        self.send_cursor(self.http.post(url).json(&body)).await
    }

    async fn next_page(&self, cursor_id: &str) -> Result<CursorPage, DatabaseError> {
        let url = self.endpoint(&["_api", "cursor", cursor_id])?;

        self.send_cursor(self.http.put(url)).await.map_err(|err| match err {
            DatabaseError::Server { code, error_num, message }
                if error_num == ERROR_CURSOR_NOT_FOUND || code == StatusCode::NOT_FOUND.as_u16() =>
            {
                DatabaseError::CursorNotFound { message }
            }
            other => other,
        })
    }

    async fn ensure_collection(
        &self,
        name: &str,
        kind: CollectionKind,
    ) -> Result<bool, DatabaseError> {
        let url = self.endpoint(&["_api", "collection", name])?;
        match self.send(self.http.get(url)).await {
            Ok(_) => return Ok(false),
            Err(DatabaseError::Server { code, .. }) if code == StatusCode::NOT_FOUND.as_u16() => {}
            Err(other) => return Err(other),
        }

        let url = self.endpoint(&["_api", "collection"])?;
        let body = json!({ "name": name, "type": kind.arango_type() });
        self.send(self.http.post(url).json(&body)).await?;

        info!("Created {:?} collection {}", kind, name);
        Ok(true)
    }

    async fn import_documents(
        &self,
        collection: &str,
        documents: &[Value],
        options: &ImportOptions,
    ) -> Result<Value, DatabaseError> {
        let url = self.endpoint(&["_api", "import"])?;

        let mut payload = String::new();
        for doc in documents {
            payload.push_str(&doc.to_string());
            payload.push('\n');
        }

        let request = self
            .http
            .post(url)
            .query(&[
                ("collection", collection),
                ("type", "documents"),
                ("onDuplicate", options.on_duplicate.as_str()),
                ("overwrite", if options.overwrite { "true" } else { "false" }),
                ("details", if options.details { "true" } else { "false" }),
            ])
            .body(payload);

        info!("Importing {} document(s) into {}", documents.len(), collection);
        self.send(request).await
    }

    async fn server_version(&self) -> Result<String, DatabaseError> {
        let url = self.endpoint(&["_api", "version"])?;
        let body = self.send(self.http.get(url)).await?;

        body.get("version")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                DatabaseError::InvalidResponse("version missing from /_api/version".to_string())
            })
    }
}
