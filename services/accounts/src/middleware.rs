//! Middleware for JWT token validation and authentication

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::warn;

use crate::{error::ApiError, models::Account, state::AppState};

/// The account a verified access token resolved to
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Account);

/// Parse the bearer token, verify it, load its account and attach it to the
/// request before calling the next handler.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !req.headers().contains_key(AUTHORIZATION) {
        return Err(ApiError::MissingCredentials);
    }

    let Authorization(bearer) = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(ApiError::InvalidToken)?;

    let account = state
        .accounts
        .authenticate(bearer.token())
        .await
        .inspect_err(|e| warn!("Rejected bearer token: {}", e))?;

    req.extensions_mut().insert(AuthenticatedUser(account));

    Ok(next.run(req).await)
}
