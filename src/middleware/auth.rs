use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::extract_token;
use crate::error::ApiError;

/// Resolves the caller's token into a `CallerIdentity` request extension.
///
/// Runs before any handler that can reach the database. A rejected token ends
/// the request here with a 403; a missing token continues as anonymous and is
/// left to the handler to refuse when it needs a role.
pub async fn caller_identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())?;
    let caller = state.auth.identify(token).await?;

    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}
