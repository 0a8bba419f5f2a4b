//! Error handling module
//!
//! Provides unified error types and handling for the entire application.

use crate::cluster::ClusterError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Message returned for every permission or ownership failure.
///
/// Callers never learn which specific check rejected them.
pub const NOT_AUTHORIZED: &str = "Not Authorized";

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Not Authorized")]
    NotAuthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cluster unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Inconsistent state: {0}")]
    Inconsistency(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Pool(_) => "POOL_EXHAUSTED",
            AppError::NotAuthorized => "NOT_AUTHORIZED",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::Inconsistency(_) => "INTERNAL_INCONSISTENCY",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<ClusterError> for AppError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::Unreachable(msg) | ClusterError::Auth(msg) => {
                AppError::UpstreamUnavailable(msg)
            }
            ClusterError::NotFound(msg) => AppError::NotFound(msg),
            ClusterError::Conflict(msg) => AppError::Conflict(msg),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::Pool(e) => {
                error!("Pool error: {:?}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Database connection pool exhausted".to_string(),
                    Some(e.to_string()),
                )
            }
            AppError::NotAuthorized => (StatusCode::FORBIDDEN, NOT_AUTHORIZED.to_string(), None),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::UpstreamUnavailable(msg) => {
                warn!("Cluster unavailable: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone(), None)
            }
            AppError::Inconsistency(msg) => {
                error!("Inconsistent state: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Inventory and cluster state may be inconsistent".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Config(msg) => {
                error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A configuration error occurred".to_string(),
                    Some(msg.clone()),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error: details,
            code: Some(self.code().to_string()),
        });

        (status, body).into_response()
    }
}

/// Result type alias for engines and handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper function to create a validation error
pub fn validation_error(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}

/// Helper function to create a conflict error
pub fn conflict_error(msg: impl Into<String>) -> AppError {
    AppError::Conflict(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_authorized_is_uniform() {
        assert_eq!(AppError::NotAuthorized.to_string(), NOT_AUTHORIZED);
        assert_eq!(AppError::NotAuthorized.code(), "NOT_AUTHORIZED");
    }

    #[test]
    fn test_cluster_errors_map_to_taxonomy() {
        let unreachable: AppError = ClusterError::Unreachable("dev down".into()).into();
        assert!(matches!(unreachable, AppError::UpstreamUnavailable(_)));

        let auth: AppError = ClusterError::Auth("bad token".into()).into();
        assert!(matches!(auth, AppError::UpstreamUnavailable(_)));

        let conflict: AppError = ClusterError::Conflict("exists".into()).into();
        assert!(matches!(conflict, AppError::Conflict(_)));
    }

    #[test]
    fn test_status_codes() {
        let resp = AppError::NotAuthorized.into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = conflict_error("owned by Team A").into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = AppError::UpstreamUnavailable("x".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
