use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub arango: ArangoConfig,
    pub auth: AuthConfig,
    pub specs: SpecsConfig,
    pub query: QueryConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArangoConfig {
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Roles from the auth service, resource ids from the workspace service
    Remote,
    /// Roles and resource ids carried in a locally verified HS256 token
    Jwt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub auth_url: String,
    pub workspace_url: String,
    pub jwt_secret: String,
    pub admin_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecsConfig {
    pub path: PathBuf,
    pub repo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub default_batch_size: u32,
    pub max_batch_size: u32,
    pub authorized_ids_bind_var: String,
    pub template_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // ArangoDB overrides
        if let Ok(v) = env::var("ARANGO_URL") {
            self.arango.url = v;
        }
        if let Ok(v) = env::var("ARANGO_DB") {
            self.arango.database = v;
        }
        if let Ok(v) = env::var("ARANGO_USER") {
            self.arango.username = v;
        }
        if let Ok(v) = env::var("ARANGO_PASS") {
            self.arango.password = v;
        }
        if let Ok(v) = env::var("ARANGO_TIMEOUT_SECS") {
            self.arango.timeout_secs = v.parse().unwrap_or(self.arango.timeout_secs);
        }

        // Auth overrides
        if let Ok(v) = env::var("AUTH_MODE") {
            match v.to_ascii_lowercase().as_str() {
                "jwt" => self.auth.mode = AuthMode::Jwt,
                "remote" => self.auth.mode = AuthMode::Remote,
                other => tracing::warn!("Ignoring unknown AUTH_MODE '{}'", other),
            }
        }
        if let Ok(v) = env::var("AUTH_URL") {
            self.auth.auth_url = v;
        }
        if let Ok(v) = env::var("WORKSPACE_URL") {
            self.auth.workspace_url = v;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Ok(v) = env::var("ADMIN_ROLE") {
            self.auth.admin_role = v;
        }

        // Spec repository overrides
        if let Ok(v) = env::var("SPECS_PATH") {
            self.specs.path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SPECS_REPO_URL") {
            self.specs.repo_url = Some(v);
        }

        // Query overrides
        if let Ok(v) = env::var("QUERY_DEFAULT_BATCH_SIZE") {
            self.query.default_batch_size = v.parse().unwrap_or(self.query.default_batch_size);
        }
        if let Ok(v) = env::var("QUERY_MAX_BATCH_SIZE") {
            self.query.max_batch_size = v.parse().unwrap_or(self.query.max_batch_size);
        }
        if let Ok(v) = env::var("QUERY_AUTHORIZED_IDS_BIND_VAR") {
            self.query.authorized_ids_bind_var = v;
        }
        if let Ok(v) = env::var("QUERY_TEMPLATE_CACHE") {
            self.query.template_cache = v.parse().unwrap_or(self.query.template_cache);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            arango: ArangoConfig {
                url: "http://localhost:8529".to_string(),
                database: "_system".to_string(),
                username: "root".to_string(),
                password: String::new(),
                timeout_secs: 30,
            },
            auth: AuthConfig {
                mode: AuthMode::Remote,
                auth_url: "http://localhost:5001".to_string(),
                workspace_url: "http://localhost:5002".to_string(),
                jwt_secret: String::new(),
                admin_role: "RE_ADMIN".to_string(),
            },
            specs: SpecsConfig {
                path: PathBuf::from("spec"),
                repo_url: None,
            },
            query: QueryConfig {
                default_batch_size: 100,
                max_batch_size: 10_000,
                authorized_ids_bind_var: "authorized_resource_ids".to_string(),
                template_cache: false,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
        }
    }

    pub fn staging() -> Self {
        let dev = Self::development();
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                ..dev.server
            },
            arango: ArangoConfig {
                timeout_secs: 10,
                ..dev.arango
            },
            query: QueryConfig {
                max_batch_size: 5_000,
                template_cache: true,
                ..dev.query
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 50 * 1024 * 1024, // 50MB, bulk imports
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            ..dev
        }
    }

    pub fn production() -> Self {
        let dev = Self::development();
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                ..dev.server
            },
            arango: ArangoConfig {
                timeout_secs: 5,
                ..dev.arango
            },
            query: QueryConfig {
                max_batch_size: 1_000,
                template_cache: true,
                ..dev.query
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 50 * 1024 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            ..dev
        }
    }

    /// Configuration readback for `GET /api/v2/config`. Credentials and secrets
    /// never leave the process.
    pub fn public_view(&self) -> Value {
        json!({
            "environment": self.environment,
            "arango_url": self.arango.url,
            "arango_db": self.arango.database,
            "auth_mode": self.auth.mode,
            "auth_url": self.auth.auth_url,
            "workspace_url": self.auth.workspace_url,
            "admin_role": self.auth.admin_role,
            "spec_path": self.specs.path,
            "spec_repo_url": self.specs.repo_url,
            "default_batch_size": self.query.default_batch_size,
            "max_batch_size": self.query.max_batch_size,
            "authorized_ids_bind_var": self.query.authorized_ids_bind_var,
        })
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
