//! User management handlers
//!
//! Account-level operations on identities. Listing and role assignment are
//! admin-only routes; the per-account routes admit the owner or an admin.

use crate::audit::AuditContext;
use crate::auth::{MessageResponse, Principal, SetRoleRequest, UpdateUserRequest, UserInfo};
use crate::error::{AppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// List all users (admin)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "All accounts", body = [UserInfo]),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 403, description = "Admin role required", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let users = state.auth.list_users().await?;
    Ok(Json(users))
}

/// Get one user (owner or admin)
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User profile", body = UserInfo),
        (status = 403, description = "Not the owner", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let user = state.auth.get_user(&principal, id, &ctx).await?;
    Ok(Json(user))
}

/// Update email and/or password (owner or admin)
#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserInfo),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 403, description = "Not the owner", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let user = state.auth.update_user(&principal, id, request, &ctx).await?;
    Ok(Json(user))
}

/// Assign a role (admin)
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserInfo),
        (status = 400, description = "Unknown role", body = crate::error::ApiError),
        (status = 403, description = "Admin role required", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn set_role(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<SetRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let user = state.auth.set_role(&principal, id, request.role, &ctx).await?;
    Ok(Json(user))
}

/// Delete an account (owner or admin)
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    state.auth.delete_user(&principal, id, &ctx).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}
