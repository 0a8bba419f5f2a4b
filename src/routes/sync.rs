//! Reconcile view and bulk sync route handlers

use super::parse_kind;
use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::lifecycle::{SyncBatch, SyncSummary};
use crate::models::ApiResponse;
use crate::paging::{Page, PageQuery};
use crate::reconcile::ReconciledView;
use crate::state::SharedState;
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncViewQuery {
    pub env: String,
    pub search: Option<String>,
    pub page_no: Option<String>,
    pub current_page: Option<String>,
}

/// Managed inventory merged with the live cluster
pub async fn sync_view(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(kind): Path<String>,
    Query(query): Query<SyncViewQuery>,
) -> ApiResult<Json<ApiResponse<Page<ReconciledView>>>> {
    let kind = parse_kind(&kind)?;
    let page = PageQuery {
        page_no: query.page_no,
        current_page: query.current_page,
    };

    let rows = state
        .reconciler
        .reconcile(&ctx, kind, &query.env, query.search.as_deref(), &page)
        .await?;
    Ok(Json(ApiResponse::with_data("success", rows)))
}

/// "No records updated" is not an HTTP error; the envelope carries success=false
pub async fn apply_sync(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(kind): Path<String>,
    Json(batch): Json<SyncBatch>,
) -> ApiResult<Json<ApiResponse<SyncSummary>>> {
    let kind = parse_kind(&kind)?;
    info!("{} syncing {} {} row(s)", ctx.principal, batch.updates.len(), kind);

    let summary = state.lifecycle.apply_sync(&ctx, kind, batch).await?;
    Ok(Json(summary_response(summary)))
}

fn summary_response(summary: SyncSummary) -> ApiResponse<SyncSummary> {
    ApiResponse {
        success: summary.success,
        message: summary.message.clone(),
        data: Some(summary),
    }
}
