//! Authentication API handlers
//!
//! Provides HTTP endpoints for registration, login, token refresh, logout
//! and the caller's own profile.

use crate::audit::AuditContext;
use crate::auth::{
    LoginRequest, MessageResponse, Principal, RefreshRequest, RegisterRequest, RegisterResponse,
    TokenPair, UserInfo,
};
use crate::error::{AppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Register a new user account
///
/// New users are assigned the `customer` role.
///
/// # Responses
///
/// * `201 Created` - User registered
/// * `400 Bad Request` - Malformed body, invalid email or password length
/// * `409 Conflict` - Email already registered
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let user = state.auth.register(request, &ctx).await?;

    let response = RegisterResponse {
        message: "Registration successful".to_string(),
        user,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password
///
/// Returns an access token and a refresh token. The refresh token replaces
/// any earlier session of the same account.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let pair = state.auth.login(request, &ctx).await?;

    Ok(Json(pair))
}

/// Refresh access token
///
/// Exchanges the current refresh token for a new pair. The presented token
/// is superseded and will be refused from then on. If the response is lost,
/// the client must log in again.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed successfully", body = TokenPair),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Invalid, expired or superseded refresh token", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let pair = state.auth.refresh(request, &ctx).await?;

    Ok(Json(pair))
}

/// Logout current session
///
/// Clears the refresh session. Access tokens already issued remain valid
/// until their own expiry.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    state.auth.logout(&principal, &ctx).await?;

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// Get current user profile
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user profile", body = UserInfo),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 404, description = "Account no longer exists", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.current_user(&principal).await?;

    Ok(Json(user))
}
