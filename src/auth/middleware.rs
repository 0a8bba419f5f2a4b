//! Authentication middleware
//!
//! Validates the bearer token and attaches the caller's `RequestContext`.

use crate::auth::decode_token;
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;

/// Resolve the bearer token into a request context
///
/// Missing headers, bad tokens and unknown principals all produce the same
/// `NotAuthorized` response.
pub async fn auth_middleware(
    State(state): State<SharedState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::NotAuthorized)?;

    let claims = decode_token(bearer.token(), &state.jwt_secret)?;

    let ctx = state.directory.resolve_context(&claims.sub).ok_or_else(|| {
        debug!("Token subject '{}' is not in the directory", claims.sub);
        AppError::NotAuthorized
    })?;

    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}
