use axum::extract::{Extension, State};

use crate::app::AppState;
use crate::auth::CallerIdentity;
use crate::middleware::{ApiBody, ApiQuery, ApiResponse, ApiResult};
use crate::query::{QueryBody, QueryParams, QueryRequest, ResultPage};

/// POST /api/v2/query_results - run a view, continue a cursor, or (admins) run ad-hoc query text
///
/// Query string: `view`, `cursor_id`, `batch_size`.
/// Body (optional JSON): `query`, `bind_vars`, `template_vars`.
pub async fn post(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    ApiQuery(params): ApiQuery<QueryParams>,
    ApiBody(body): ApiBody,
) -> ApiResult<ResultPage> {
    let body = QueryBody::from_slice(&body)?;
    let request = QueryRequest::from_parts(body, params, &state.config.query)?;

    let page = state.dispatcher().dispatch(request, &caller).await?;
    Ok(ApiResponse::success(page))
}
