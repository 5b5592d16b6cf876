//! Caller identity resolution and role gating.
//!
//! Every request that can touch the database resolves its bearer token into a
//! [`CallerIdentity`] before anything else runs. An absent token is an anonymous
//! caller with no authorized resources; a token the identity provider rejects is
//! an error, never a silent downgrade to anonymous.

pub mod jwt;
pub mod remote;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::Serialize;
use thiserror::Error;

use crate::types::ResourceId;

pub use jwt::{generate_jwt, Claims, JwtIdentityProvider};
pub use remote::RemoteIdentityProvider;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,

    #[error("Invalid Authorization header: {0}")]
    MalformedHeader(String),

    #[error("Token rejected: {0}")]
    Rejected(String),

    #[error("Identity service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Missing required role '{required}'")]
    MissingRole { required: String },

    #[error("Identity provider misconfigured: {0}")]
    Misconfigured(String),
}

/// What an identity provider knows about a token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user: Option<String>,
    pub roles: BTreeSet<String>,
    pub resource_ids: Vec<ResourceId>,
}

/// Resolves an opaque bearer token into roles and authorized resource ids
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, AuthError>;
}

/// Identity of the caller for the lifetime of one request
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallerIdentity {
    #[serde(skip)]
    token: Option<String>,
    pub user: Option<String>,
    pub roles: BTreeSet<String>,
    pub authorized_resource_ids: Vec<ResourceId>,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(token: String, resolved: ResolvedIdentity) -> Self {
        let mut authorized_resource_ids = resolved.resource_ids;
        authorized_resource_ids.sort_unstable();
        authorized_resource_ids.dedup();

        Self {
            token: Some(token),
            user: resolved.user,
            roles: resolved.roles,
            authorized_resource_ids,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Front door for identity: token resolution plus the administrative capability check
pub struct AuthGateway {
    provider: Arc<dyn IdentityProvider>,
    admin_role: String,
}

impl AuthGateway {
    pub fn new(provider: Arc<dyn IdentityProvider>, admin_role: impl Into<String>) -> Self {
        Self {
            provider,
            admin_role: admin_role.into(),
        }
    }

    /// Resolve the caller once per request. No token means anonymous with no resources.
    pub async fn identify(&self, token: Option<String>) -> Result<CallerIdentity, AuthError> {
        let Some(token) = token else {
            return Ok(CallerIdentity::anonymous());
        };

        let resolved = self.provider.resolve(&token).await.map_err(|e| {
            tracing::warn!("Rejected caller token: {}", e);
            e
        })?;

        tracing::debug!(
            "Resolved caller {:?} with {} role(s) and {} authorized resource(s)",
            resolved.user,
            resolved.roles.len(),
            resolved.resource_ids.len()
        );

        Ok(CallerIdentity::authenticated(token, resolved))
    }

    /// Administrative operations need a token carrying the admin role.
    pub fn require_admin(&self, caller: &CallerIdentity) -> Result<(), AuthError> {
        if !caller.is_authenticated() {
            return Err(AuthError::MissingToken);
        }
        if !caller.has_role(&self.admin_role) {
            tracing::warn!("Caller {:?} lacks role '{}'", caller.user, self.admin_role);
            return Err(AuthError::MissingRole {
                required: self.admin_role.clone(),
            });
        }
        Ok(())
    }
}

/// Pull the token out of the Authorization header.
///
/// Accepts `Bearer <token>` as well as a bare token, which older clients send.
pub fn extract_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| AuthError::MalformedHeader("header is not valid ASCII".to_string()))?
        .trim();

    let token = match raw.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => {
            return Err(AuthError::MalformedHeader(
                "expected 'Bearer <token>'".to_string(),
            ))
        }
        None => raw,
    };

    if token.is_empty() {
        return Err(AuthError::MalformedHeader("empty token".to_string()));
    }

    Ok(Some(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::collections::HashMap;

    struct StaticProvider(HashMap<String, ResolvedIdentity>);

    #[async_trait]
    impl IdentityProvider for StaticProvider {
        async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, AuthError> {
            self.0
                .get(token)
                .cloned()
                .ok_or_else(|| AuthError::Rejected("unknown token".to_string()))
        }
    }

    fn gateway() -> AuthGateway {
        let mut tokens = HashMap::new();
        tokens.insert(
            "admin".to_string(),
            ResolvedIdentity {
                user: Some("root".to_string()),
                roles: BTreeSet::from(["RE_ADMIN".to_string()]),
                resource_ids: vec![99, 3, 3],
            },
        );
        tokens.insert(
            "reader".to_string(),
            ResolvedIdentity {
                user: Some("reader".to_string()),
                roles: BTreeSet::new(),
                resource_ids: vec![7],
            },
        );
        AuthGateway::new(Arc::new(StaticProvider(tokens)), "RE_ADMIN")
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extract_token_accepts_bearer_and_bare_forms() {
        assert_eq!(extract_token(&headers("Bearer abc")).unwrap(), Some("abc".to_string()));
        assert_eq!(extract_token(&headers("bearer abc")).unwrap(), Some("abc".to_string()));
        assert_eq!(extract_token(&headers("abc")).unwrap(), Some("abc".to_string()));
        assert_eq!(extract_token(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn extract_token_rejects_other_schemes_and_empty_tokens() {
        assert!(matches!(
            extract_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::MalformedHeader(_))
        ));
        assert!(matches!(
            extract_token(&headers("Bearer ")),
            Err(AuthError::MalformedHeader(_))
        ));
    }

    #[tokio::test]
    async fn absent_token_is_anonymous_with_no_resources() {
        let caller = gateway().identify(None).await.unwrap();
        assert!(!caller.is_authenticated());
        assert!(caller.authorized_resource_ids.is_empty());
    }

    #[tokio::test]
    async fn resolved_ids_are_sorted_and_deduplicated() {
        let caller = gateway().identify(Some("admin".to_string())).await.unwrap();
        assert_eq!(caller.authorized_resource_ids, vec![3, 99]);
        assert!(caller.is_authenticated());
    }

    #[tokio::test]
    async fn unknown_token_fails_closed() {
        let result = gateway().identify(Some("forged".to_string())).await;
        assert!(matches!(result, Err(AuthError::Rejected(_))));
    }

    #[tokio::test]
    async fn require_admin_is_a_role_predicate() {
        let gateway = gateway();

        let admin = gateway.identify(Some("admin".to_string())).await.unwrap();
        assert!(gateway.require_admin(&admin).is_ok());

        let reader = gateway.identify(Some("reader".to_string())).await.unwrap();
        assert!(matches!(
            gateway.require_admin(&reader),
            Err(AuthError::MissingRole { required }) if required == "RE_ADMIN"
        ));

        assert!(matches!(
            gateway.require_admin(&CallerIdentity::anonymous()),
            Err(AuthError::MissingToken)
        ));
    }
}
