use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{AuthGateway, IdentityProvider, JwtIdentityProvider, RemoteIdentityProvider};
use crate::config::{AppConfig, AuthMode};
use crate::database::{ArangoClient, GraphDatabase};
use crate::handlers;
use crate::middleware::caller_identity_middleware;
use crate::query::QueryDispatcher;
use crate::specs::{FsSpecRepository, SpecRepository};
use crate::template::ViewRenderer;

/// Shared per-process dependencies handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthGateway>,
    pub database: Arc<dyn GraphDatabase>,
    pub specs: Arc<dyn SpecRepository>,
    pub renderer: Arc<ViewRenderer>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        database: Arc<dyn GraphDatabase>,
        specs: Arc<dyn SpecRepository>,
    ) -> Self {
        let auth = AuthGateway::new(identity, config.auth.admin_role.clone());
        let renderer = ViewRenderer::new(config.query.template_cache);

        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            database,
            specs,
            renderer: Arc::new(renderer),
        }
    }

    /// Wire the production collaborators described by the configuration
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let database =
            ArangoClient::new(&config.arango).context("failed to configure ArangoDB client")?;

        let identity: Arc<dyn IdentityProvider> = match config.auth.mode {
            AuthMode::Remote => Arc::new(
                RemoteIdentityProvider::new(
                    reqwest::Client::new(),
                    &config.auth.auth_url,
                    &config.auth.workspace_url,
                )
                .context("failed to configure remote identity provider")?,
            ),
            AuthMode::Jwt => Arc::new(
                JwtIdentityProvider::new(&config.auth.jwt_secret)
                    .context("failed to configure JWT identity provider")?,
            ),
        };

        let specs = FsSpecRepository::new(config.specs.path.clone());

        Ok(Self::new(config, identity, Arc::new(database), Arc::new(specs)))
    }

    pub fn dispatcher(&self) -> QueryDispatcher<'_> {
        QueryDispatcher::new(
            &self.auth,
            self.specs.as_ref(),
            &self.renderer,
            self.database.as_ref(),
            &self.config.query.authorized_ids_bind_var,
        )
    }
}

pub fn router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let mut app = Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        .nest("/api/v2", api_routes(state.clone()))
        .fallback(handlers::public::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
                .layer(cors_layer(&config)),
        )
        .with_state(state);

    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }
    app
}

fn api_routes(state: AppState) -> Router<AppState> {
    // Spec and config introspection never needs a caller identity
    let introspection = Router::new()
        .route("/specs/schemas", get(handlers::public::schemas_get))
        .route("/specs/views", get(handlers::public::views_get))
        .route("/config", get(handlers::public::config_get));

    // Everything that reaches the database resolves the caller first
    let scoped = Router::new()
        .route("/query_results", post(handlers::protected::query_results_post))
        .route("/specs", put(handlers::elevated::specs_put))
        .route("/documents", put(handlers::elevated::documents_put))
        .route_layer(middleware::from_fn_with_state(state, caller_identity_middleware));

    introspection.merge(scoped)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    if config.security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any)
}
