#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use relation_engine_api::auth::{AuthError, IdentityProvider, ResolvedIdentity};
use relation_engine_api::config::AppConfig;
use relation_engine_api::database::{
    CollectionKind, CursorPage, DatabaseError, GraphDatabase, ImportOptions,
};
use relation_engine_api::specs::{SchemaDefinition, SpecError, SpecRepository, ViewDefinition};
use relation_engine_api::types::BindVars;
use relation_engine_api::{router, AppState};

pub const ADMIN_TOKEN: &str = "admin_token";
pub const VALID_TOKEN: &str = "valid_token";
pub const INVALID_TOKEN: &str = "invalid_token";

pub const SCOPE_KEY: &str = "authorized_resource_ids";

/// Tokens known to the fake identity service
pub struct FakeIdentity {
    tokens: HashMap<String, ResolvedIdentity>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(
            ADMIN_TOKEN.to_string(),
            ResolvedIdentity {
                user: Some("admin".to_string()),
                roles: BTreeSet::from(["RE_ADMIN".to_string()]),
                resource_ids: vec![99],
            },
        );
        tokens.insert(
            VALID_TOKEN.to_string(),
            ResolvedIdentity {
                user: Some("reader".to_string()),
                roles: BTreeSet::new(),
                resource_ids: vec![1, 2, 3],
            },
        );
        Self { tokens }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::Rejected("unknown token".to_string()))
    }
}

/// Views and schemas held in memory
pub struct StaticSpecs {
    views: HashMap<String, String>,
    schemas: Vec<SchemaDefinition>,
}

impl StaticSpecs {
    pub fn new() -> Self {
        let mut views = HashMap::new();
        views.insert(
            "list_test_vertices".to_string(),
            format!("FOR o IN test_vertex FILTER o.is_public || o.ws_id IN @{SCOPE_KEY} RETURN o"),
        );
        views.insert(
            "list_collection".to_string(),
            format!(
                "FOR o IN {{{{ collection }}}} FILTER o.is_public || o.ws_id IN @{SCOPE_KEY} RETURN o"
            ),
        );

        let schemas = vec![
            SchemaDefinition {
                name: "test_edge".to_string(),
                kind: CollectionKind::Edge,
                schema: json!({"type": "object"}),
            },
            SchemaDefinition {
                name: "test_vertex".to_string(),
                kind: CollectionKind::Vertex,
                schema: json!({"type": "object", "required": ["_key"]}),
            },
        ];

        Self { views, schemas }
    }
}

#[async_trait]
impl SpecRepository for StaticSpecs {
    async fn view(&self, name: &str) -> Result<ViewDefinition, SpecError> {
        self.views
            .get(name)
            .map(|source| ViewDefinition {
                name: name.to_string(),
                template_source: source.clone(),
            })
            .ok_or_else(|| SpecError::ViewNotFound(name.to_string()))
    }

    async fn view_names(&self) -> Result<Vec<String>, SpecError> {
        let mut names: Vec<String> = self.views.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn schema(&self, name: &str) -> Result<SchemaDefinition, SpecError> {
        self.schemas
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| SpecError::SchemaNotFound(name.to_string()))
    }

    async fn schemas(&self) -> Result<Vec<SchemaDefinition>, SpecError> {
        Ok(self.schemas.clone())
    }
}

/// Every call the fake database received, in order
#[derive(Debug, Clone)]
pub enum DbCall {
    Start {
        query: String,
        bind_vars: BindVars,
        batch_size: u32,
    },
    Next {
        cursor_id: String,
    },
    EnsureCollection {
        name: String,
        kind: CollectionKind,
    },
    Import {
        collection: String,
        count: usize,
        overwrite: bool,
    },
}

struct OpenCursor {
    remaining: VecDeque<Value>,
    batch_size: usize,
    count: u64,
}

#[derive(Default)]
struct FakeState {
    documents: Vec<Value>,
    collections: BTreeSet<String>,
    cursors: HashMap<String, OpenCursor>,
    next_cursor: u64,
    calls: Vec<DbCall>,
}

/// In-memory stand-in for ArangoDB.
///
/// Every query reads the `test_vertex` documents. When the query declares the
/// scope bind variable, only public documents and those whose `ws_id` is in
/// that variable are returned.
#[derive(Default)]
pub struct FakeDatabase {
    state: Mutex<FakeState>,
}

impl FakeDatabase {
    pub fn with_documents(documents: Vec<Value>) -> Self {
        let db = Self::default();
        {
            let mut state = db.state.lock().unwrap();
            state.documents = documents;
            state.collections.insert("test_vertex".to_string());
        }
        db
    }

    pub fn calls(&self) -> Vec<DbCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn documents(&self) -> Vec<Value> {
        self.state.lock().unwrap().documents.clone()
    }

    pub fn last_bind_vars(&self) -> Option<BindVars> {
        self.calls().into_iter().rev().find_map(|call| match call {
            DbCall::Start { bind_vars, .. } => Some(bind_vars),
            _ => None,
        })
    }

    fn take_page(state: &mut FakeState, cursor_id: String, mut cursor: OpenCursor) -> CursorPage {
        let take = cursor.batch_size.min(cursor.remaining.len());
        let result: Vec<Value> = cursor.remaining.drain(..take).collect();
        let has_more = !cursor.remaining.is_empty();
        let count = cursor.count;

        // Like ArangoDB, the id is still reported on the last page but the cursor is gone
        if has_more {
            state.cursors.insert(cursor_id.clone(), cursor);
        }

        CursorPage {
            result,
            has_more,
            id: Some(cursor_id),
            count: Some(count),
            stats: Some(json!({"scannedFull": count})),
        }
    }
}

/// `@name` bind parameters a query declares
fn declared_bind_params(query: &str) -> BTreeSet<String> {
    let mut params = BTreeSet::new();
    let mut chars = query.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '@' {
            continue;
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if !name.is_empty() {
            params.insert(name);
        }
    }
    params
}

fn server_error(error_num: i64, message: String) -> DatabaseError {
    DatabaseError::Server {
        code: 400,
        error_num,
        message,
    }
}

#[async_trait]
impl GraphDatabase for FakeDatabase {
    async fn start_query(
        &self,
        query: &str,
        bind_vars: &BindVars,
        batch_size: u32,
    ) -> Result<CursorPage, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DbCall::Start {
            query: query.to_string(),
            bind_vars: bind_vars.clone(),
            batch_size,
        });

        let declared = declared_bind_params(query);
        for name in bind_vars.keys() {
            if !declared.contains(name) {
                return Err(server_error(
                    1552,
                    format!("bind parameter '{}' was not declared in the query", name),
                ));
            }
        }
        for name in &declared {
            if !bind_vars.contains_key(name) {
                return Err(server_error(
                    1551,
                    format!("no value specified for declared bind parameter '{}'", name),
                ));
            }
        }

        let scope: Option<Vec<Value>> = if declared.contains(SCOPE_KEY) {
            bind_vars.get(SCOPE_KEY).and_then(Value::as_array).cloned()
        } else {
            None
        };

        let matches: VecDeque<Value> = state
            .documents
            .iter()
            .filter(|doc| match &scope {
                None => true,
                Some(ids) => {
                    doc["is_public"] == json!(true)
                        || doc.get("ws_id").map(|ws| ids.contains(ws)).unwrap_or(false)
                }
            })
            .cloned()
            .collect();

        state.next_cursor += 1;
        let cursor_id = format!("{}", 1000 + state.next_cursor);
        let cursor = OpenCursor {
            count: matches.len() as u64,
            remaining: matches,
            batch_size: batch_size.max(1) as usize,
        };
        Ok(Self::take_page(&mut state, cursor_id, cursor))
    }

    async fn next_page(&self, cursor_id: &str) -> Result<CursorPage, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DbCall::Next {
            cursor_id: cursor_id.to_string(),
        });

        let cursor = state
            .cursors
            .remove(cursor_id)
            .ok_or_else(|| DatabaseError::CursorNotFound {
                message: "cursor not found".to_string(),
            })?;
        Ok(Self::take_page(&mut state, cursor_id.to_string(), cursor))
    }

    async fn ensure_collection(
        &self,
        name: &str,
        kind: CollectionKind,
    ) -> Result<bool, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DbCall::EnsureCollection {
            name: name.to_string(),
            kind,
        });
        Ok(state.collections.insert(name.to_string()))
    }

    async fn import_documents(
        &self,
        collection: &str,
        documents: &[Value],
        options: &ImportOptions,
    ) -> Result<Value, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DbCall::Import {
            collection: collection.to_string(),
            count: documents.len(),
            overwrite: options.overwrite,
        });

        if options.overwrite {
            state.documents.clear();
        }
        state.documents.extend(documents.iter().cloned());

        Ok(json!({
            "error": false,
            "created": documents.len(),
            "errors": 0,
            "empty": 0,
            "updated": 0,
            "ignored": 0,
            "details": [],
        }))
    }

    async fn server_version(&self) -> Result<String, DatabaseError> {
        Ok("3.11.0".to_string())
    }
}

pub struct TestApp {
    pub router: Router,
    pub database: Arc<FakeDatabase>,
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.query.authorized_ids_bind_var = SCOPE_KEY.to_string();
    config.api.enable_request_logging = false;
    config
}

pub fn test_app(documents: Vec<Value>) -> TestApp {
    test_app_with_config(test_config(), documents)
}

pub fn test_app_with_config(config: AppConfig, documents: Vec<Value>) -> TestApp {
    let database = Arc::new(FakeDatabase::with_documents(documents));
    let state = AppState::new(
        config,
        Arc::new(FakeIdentity::new()),
        database.clone(),
        Arc::new(StaticSpecs::new()),
    );

    TestApp {
        router: router(state),
        database,
    }
}

/// `count` public test vertices
pub fn public_vertices(count: usize) -> Vec<Value> {
    (1..=count)
        .map(|i| json!({"_key": i.to_string(), "name": format!("vertex_{}", i), "is_public": true}))
        .collect()
}

/// One private vertex owned by workspace `ws_id`
pub fn private_vertex(key: &str, ws_id: i64) -> Value {
    json!({"_key": key, "name": "requires_auth", "ws_id": ws_id, "is_public": false})
}

/// Serve `app` on a free local port, returning its base URL
pub async fn spawn_upstream(app: Router) -> Result<String> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind fake upstream")?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("fake upstream stopped: {}", e);
        }
    });
    Ok(format!("http://127.0.0.1:{}", port))
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .context("failed to build request")?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("router failed")?;
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response was not JSON")?
        };
        Ok((status, json))
    }

    pub async fn post(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, token, body.map(|b| b.to_string())).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, token, None).await
    }
}
