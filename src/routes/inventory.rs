//! Managed inventory and live cluster route handlers

use super::parse_kind;
use crate::cluster::ClusterHealth;
use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::models::ApiResponse;
use crate::paging::{Page, PageQuery};
use crate::reconcile::InventoryView;
use crate::state::SharedState;
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryQuery {
    pub env: String,
    pub search: Option<String>,
    pub page_no: Option<String>,
    pub current_page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnvQuery {
    pub env: String,
}

#[derive(Debug, Deserialize)]
pub struct DetailsQuery {
    pub env: String,
    pub name: String,
}

pub async fn list_inventory(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(kind): Path<String>,
    Query(query): Query<InventoryQuery>,
) -> ApiResult<Json<ApiResponse<Page<InventoryView>>>> {
    let kind = parse_kind(&kind)?;
    let page = PageQuery {
        page_no: query.page_no,
        current_page: query.current_page,
    };

    let entries = state
        .reconciler
        .list_managed(&ctx, kind, &query.env, query.search.as_deref(), &page)
        .await?;
    Ok(Json(ApiResponse::with_data("success", entries)))
}

/// Names currently present on the cluster
pub async fn list_live(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(kind): Path<String>,
    Query(query): Query<EnvQuery>,
) -> ApiResult<Json<ApiResponse<Vec<String>>>> {
    let kind = parse_kind(&kind)?;
    let names = state.reconciler.list_live(&ctx, kind, &query.env).await?;
    Ok(Json(ApiResponse::with_data("success", names)))
}

pub async fn resource_details(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(kind): Path<String>,
    Query(query): Query<DetailsQuery>,
) -> ApiResult<Json<ApiResponse<String>>> {
    let kind = parse_kind(&kind)?;
    let details = state
        .reconciler
        .resource_details(&ctx, kind, &query.env, &query.name)
        .await?;
    Ok(Json(ApiResponse::with_data("success", details)))
}

pub async fn cluster_status(
    State(state): State<SharedState>,
    Extension(ctx): Extension<RequestContext>,
    Path(kind): Path<String>,
    Query(query): Query<EnvQuery>,
) -> ApiResult<Json<ApiResponse<ClusterHealth>>> {
    let kind = parse_kind(&kind)?;
    let health = state.reconciler.cluster_status(&ctx, kind, &query.env).await?;
    Ok(Json(ApiResponse::with_data("success", health)))
}
