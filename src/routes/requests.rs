//! Change request route handlers

use super::parse_kind;
use crate::context::RequestContext;
use crate::domain::{ChangeRequest, NewChangeRequest, Outcome, RequestFilter, RequestId, RequestStatus};
use crate::error::ApiResult;
use crate::models::ApiResponse;
use crate::paging::{Page, PageQuery};
use crate::state::SharedState;
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequestsQuery {
    pub status: Option<RequestStatus>,
    pub env: Option<String>,
    pub requested_by: Option<String>,
    pub resource_name: Option<String>,
    pub page_no: Option<String>,
    pub current_page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeclineBody {
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedRequest {
    pub request_id: RequestId,
}

/// File a new change request
pub async fn submit_request(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(kind): Path<String>,
    Json(payload): Json<NewChangeRequest>,
) -> ApiResult<Json<ApiResponse<SubmittedRequest>>> {
    let kind = parse_kind(&kind)?;
    debug!("{} submitting {} request for '{}'", ctx.principal, kind, payload.resource_name);

    let request_id = state.lifecycle.submit(&ctx, kind, payload).await?;

    Ok(Json(ApiResponse::with_data(
        "Request submitted.",
        SubmittedRequest { request_id },
    )))
}

/// List requests visible to the caller
pub async fn list_requests(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(kind): Path<String>,
    Query(query): Query<ListRequestsQuery>,
) -> ApiResult<Json<ApiResponse<Page<ChangeRequest>>>> {
    let kind = parse_kind(&kind)?;

    let filter = RequestFilter {
        status: query.status,
        environment: query.env,
        requested_by: query.requested_by,
        resource_name: query.resource_name,
    };
    let page = PageQuery {
        page_no: query.page_no,
        current_page: query.current_page,
    };

    let requests = state.lifecycle.list(&ctx, kind, &filter, &page).await?;
    Ok(Json(ApiResponse::with_data("success", requests)))
}

pub async fn approve_request(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path((kind, id)): Path<(String, RequestId)>,
) -> ApiResult<Json<ApiResponse<ChangeRequest>>> {
    let kind = parse_kind(&kind)?;
    let request = state.lifecycle.decide(&ctx, kind, id, Outcome::Approve).await?;
    Ok(Json(ApiResponse::with_data("Request approved.", request)))
}

pub async fn decline_request(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path((kind, id)): Path<(String, RequestId)>,
    Json(body): Json<DeclineBody>,
) -> ApiResult<Json<ApiResponse<ChangeRequest>>> {
    let kind = parse_kind(&kind)?;
    let request = state
        .lifecycle
        .decide(&ctx, kind, id, Outcome::Decline { reason: body.reason })
        .await?;
    Ok(Json(ApiResponse::with_data("Request declined.", request)))
}

/// Withdraw an open request
pub async fn delete_request(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path((kind, id)): Path<(String, RequestId)>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let kind = parse_kind(&kind)?;
    state.lifecycle.delete(&ctx, kind, id).await?;
    Ok(Json(ApiResponse::message_only("Request deleted.")))
}
