use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Validate the access token and stash its claims in request extensions.
/// The header may hold the bare token or `Bearer <token>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let raw = req
        .headers()
        .get(&state.auth_header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("access token is not provided".into()))?;

    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();

    let claims = state.tokens.verify(token).map_err(|e| {
        debug!("rejected token: {}", e);
        ApiError::Unauthorized(e.to_string())
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
