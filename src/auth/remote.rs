use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, Response};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{AuthError, IdentityProvider, ResolvedIdentity};
use crate::types::ResourceId;

/// Identity backed by two HTTP services: the auth service knows the caller's
/// roles, the workspace service knows which workspaces the caller can read.
pub struct RemoteIdentityProvider {
    client: Client,
    me_url: Url,
    workspace_url: Url,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    user: Option<String>,
    #[serde(default)]
    customroles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WorkspaceRpcResponse {
    result: Option<Vec<WorkspaceIds>>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkspaceIds {
    #[serde(default)]
    workspaces: Vec<ResourceId>,
    #[serde(default, rename = "pub")]
    public: Vec<ResourceId>,
}

impl RemoteIdentityProvider {
    pub fn new(client: Client, auth_url: &str, workspace_url: &str) -> Result<Self, AuthError> {
        let auth_base = parse_base(auth_url)?;
        let me_url = auth_base
            .join("api/V2/me")
            .map_err(|e| AuthError::Misconfigured(format!("auth url: {}", e)))?;
        let workspace_url = Url::parse(workspace_url)
            .map_err(|e| AuthError::Misconfigured(format!("workspace url: {}", e)))?;

        Ok(Self {
            client,
            me_url,
            workspace_url,
        })
    }

    async fn fetch_me(&self, token: &str) -> Result<MeResponse, AuthError> {
        let response = self
            .client
            .get(self.me_url.clone())
            .header(AUTHORIZATION, token)
            .send()
            .await
            .map_err(|e| AuthError::ServiceUnavailable(format!("auth service: {}", e)))?;

        let response = reject_unless_success(response, "auth service").await?;
        response
            .json::<MeResponse>()
            .await
            .map_err(|e| {
                AuthError::ServiceUnavailable(format!("auth service returned invalid JSON: {}", e))
            })
    }

    async fn fetch_workspace_ids(&self, token: &str) -> Result<Vec<ResourceId>, AuthError> {
        let body = json!({
            "method": "Workspace.list_workspace_ids",
            "version": "1.1",
            "id": "relation-engine",
            "params": [{ "perm": "r" }],
        });

        let response = self
            .client
            .post(self.workspace_url.clone())
            .header(AUTHORIZATION, token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::ServiceUnavailable(format!("workspace service: {}", e)))?;

        let response = reject_unless_success(response, "workspace service").await?;
        let rpc = response
            .json::<WorkspaceRpcResponse>()
            .await
            .map_err(|e| {
                AuthError::ServiceUnavailable(format!(
                    "workspace service returned invalid JSON: {}",
                    e
                ))
            })?;

        let ids = rpc
            .result
            .and_then(|result| result.into_iter().next())
            .unwrap_or_default();

        let mut merged = ids.workspaces;
        merged.extend(ids.public);
        Ok(merged)
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, AuthError> {
        let me = self.fetch_me(token).await?;
        let resource_ids = self.fetch_workspace_ids(token).await?;

        Ok(ResolvedIdentity {
            user: me.user,
            roles: me.customroles.into_iter().collect(),
            resource_ids,
        })
    }
}

fn parse_base(raw: &str) -> Result<Url, AuthError> {
    // A trailing slash keeps Url::join from replacing the last path segment
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|e| AuthError::Misconfigured(format!("auth url: {}", e)))
}

async fn reject_unless_success(response: Response, service: &str) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // JSON-RPC services report a bad token as a 500, so any failure status is a rejection
    let detail = response.text().await.unwrap_or_default();
    Err(AuthError::Rejected(format!("{} returned {}: {}", service, status, detail)))
}
