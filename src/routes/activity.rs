//! Activity log route handlers

use crate::context::RequestContext;
use crate::domain::ActivityEntry;
use crate::error::{ApiResult, AppError};
use crate::models::ApiResponse;
use crate::paging::{paginate, Page, PageQuery};
use crate::state::SharedState;
use axum::{
    extract::{Extension, Query, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub env: Option<String>,
    pub page_no: Option<String>,
    pub current_page: Option<String>,
}

/// Tenant activity, newest first, limited to the caller's environments
pub async fn list_activity(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<ApiResponse<Page<ActivityEntry>>>> {
    if let Some(env) = &query.env {
        if !ctx.can_access_env(env) {
            return Err(AppError::NotAuthorized);
        }
    }

    let entries: Vec<_> = state
        .store
        .get_activity(ctx.tenant_id, query.env.as_deref())
        .await?
        .into_iter()
        .filter(|a| ctx.can_access_env(&a.environment))
        .collect();

    let page = PageQuery {
        page_no: query.page_no,
        current_page: query.current_page,
    };
    Ok(Json(ApiResponse::with_data(
        "success",
        paginate(entries, page.request(), page.current()),
    )))
}
