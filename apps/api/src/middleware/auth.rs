//! API-key authentication for the routes that call the classifier.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Requires `x-api-key` to match the configured `API_KEY`.
///
/// With no key configured the check is skipped (development mode).
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided != Some(expected) {
        warn!(path = %req.uri().path(), "Authentication failed: invalid or missing API key");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(req).await)
}
