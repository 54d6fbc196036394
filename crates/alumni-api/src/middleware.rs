//! Middleware — identity extraction from the bearer token.

use alumni_common::{
    auth::{self, Identity},
    error::AlumniError,
};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::AppState;

/// Validate the `Authorization: Bearer <token>` header and attach the
/// caller's [`Identity`] to the request.
///
/// Handlers pick it up with `Extension(identity): Extension<Identity>`.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AlumniError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AlumniError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AlumniError::Unauthorized)?;

    let identity: Identity = auth::validate_token(token, &state.jwt_secret)?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
