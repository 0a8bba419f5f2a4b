//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod activity;
mod inventory;
mod requests;
mod sync;

use crate::auth::auth_middleware;
use crate::config::Settings;
use crate::domain::ResourceKind;
use crate::error::{validation_error, ApiResult};
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Parse the `{kind}` path segment
fn parse_kind(raw: &str) -> ApiResult<ResourceKind> {
    raw.parse().map_err(validation_error)
}

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    // Everything under /api needs a bearer token
    let api = Router::new()
        // Change requests
        .route(
            "/{kind}/requests",
            post(requests::submit_request).get(requests::list_requests),
        )
        .route("/{kind}/requests/{id}", axum::routing::delete(requests::delete_request))
        .route("/{kind}/requests/{id}/approve", post(requests::approve_request))
        .route("/{kind}/requests/{id}/decline", post(requests::decline_request))

        // Inventory and live cluster
        .route("/{kind}/inventory", get(inventory::list_inventory))
        .route("/{kind}/live", get(inventory::list_live))
        .route("/{kind}/details", get(inventory::resource_details))
        .route("/{kind}/status", get(inventory::cluster_status))

        // Reconcile view and bulk sync
        .route("/{kind}/sync", get(sync::sync_view).post(sync::apply_sync))

        .route("/activity", get(activity::list_activity))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .nest("/api", api)

        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let layer = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };

    layer
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind_accepts_route_plurals() {
        assert_eq!(parse_kind("topics").unwrap(), ResourceKind::Topic);
        assert_eq!(parse_kind("connectors").unwrap(), ResourceKind::Connector);
        assert!(parse_kind("schemas").is_err());
    }
}
