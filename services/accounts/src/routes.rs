//! Accounts service routes

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{
    error::ApiResult,
    jwt::TokenPair,
    middleware::{AuthenticatedUser, auth_middleware},
    models::UserResponse,
    service::Registration,
    state::AppState,
};

/// Request for user registration
///
/// Fields stay raw JSON here; typing and validation happen per field in
/// [`AccountService::register`](crate::service::AccountService::register).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: Option<Value>,
    pub username: Option<Value>,
    pub password: Option<Value>,
    pub password_confirm: Option<Value>,
    pub profile: Option<Value>,
}

impl From<RegisterRequest> for Registration {
    fn from(request: RegisterRequest) -> Self {
        Registration {
            email: request.email,
            username: request.username,
            password: request.password,
            password_confirm: request.password_confirm,
            profile: request.profile,
        }
    }
}

/// Request for user login
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<Value>,
    pub password: Option<Value>,
}

/// Request for token refresh
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshTokenRequest {
    pub refresh: Option<Value>,
}

/// Response for registration and login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserResponse,
    pub tokens: TokenPair,
}

/// Response for the current user
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: UserResponse,
}

/// Create the router for the accounts service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/me/", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/register/", post(register))
        .route("/login/", post(login))
        .route("/token/refresh/", post(refresh_token))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, label) = if state.accounts.health_check().await {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        status,
        Json(serde_json::json!({
            "status": label,
            "service": "accounts-service"
        })),
    )
}

/// User registration endpoint
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;

    let (account, tokens) = state.accounts.register(payload.into()).await?;

    let response = AuthResponse {
        message: "User registered successfully".to_string(),
        user: UserResponse::from(&account),
        tokens,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;

    let (account, tokens) = state
        .accounts
        .login(payload.email.as_ref(), payload.password.as_ref())
        .await?;

    info!(user_id = %account.user.id, "Login successful");

    let response = AuthResponse {
        message: "Login successful".to_string(),
        user: UserResponse::from(&account),
        tokens,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Current user endpoint, behind [`auth_middleware`]
pub async fn me(
    Extension(AuthenticatedUser(account)): Extension<AuthenticatedUser>,
) -> impl IntoResponse {
    Json(MeResponse {
        user: UserResponse::from(&account),
    })
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;

    let tokens = state.accounts.refresh(payload.refresh.as_ref()).await?;

    Ok((StatusCode::OK, Json(tokens)))
}
