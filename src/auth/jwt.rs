use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, IdentityProvider, ResolvedIdentity};
use crate::types::ResourceId;

/// Claims carried by a locally signed caller token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub resource_ids: Vec<ResourceId>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        sub: impl Into<String>,
        roles: Vec<String>,
        resource_ids: Vec<ResourceId>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: sub.into(),
            roles,
            resource_ids,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::Misconfigured("JWT secret not configured".to_string()));
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| AuthError::Misconfigured(format!("JWT generation error: {}", e)))
}

/// Verifies HS256 tokens signed with a shared secret; roles and resource ids come from the claims
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Misconfigured("JWT secret not configured".to_string()));
        }

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        })
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::Rejected(format!("Invalid JWT token: {}", e)))?;

        let claims = token_data.claims;
        Ok(ResolvedIdentity {
            user: Some(claims.sub),
            roles: claims.roles.into_iter().collect(),
            resource_ids: claims.resource_ids,
        })
    }
}
