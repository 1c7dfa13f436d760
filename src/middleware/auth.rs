//! Bearer-token session check for the protected API surface.

use crate::{errors::AppError, state::AppState};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Extract the bearer token from the Authorization header, if well-formed.
pub fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
}

/// Reject requests that do not carry a live session token.
pub async fn require_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::unauthorized("missing or malformed bearer token"))?;

    state.users.validate_session(token).await?;
    Ok(next.run(request).await)
}
