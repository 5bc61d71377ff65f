//! Request context and API models for authentication
//!
//! - Principal: the verified `{user_id, role}` bound to a request
//! - Request bodies with `validator` rules
//! - Token and profile responses

use super::jwt::Claims;
use super::middleware::AuthError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::{Role, UserIdentity};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Verified identity attached to a request
///
/// Inserted into request extensions by `auth_middleware` exactly once and
/// read back through the `FromRequestParts` impl below. It lives in the
/// request's extensions, so it is dropped together with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl From<&Claims> for Principal {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id,
            role: claims.role,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // A handler asking for a principal on a route without auth_middleware
        // is a wiring bug, not a client error
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .ok_or(AuthError::PreconditionViolated("no principal bound to request"))
    }
}

/// Trim and lower-case an email address for lookup and storage
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Account update request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,
    /// Profile image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "Photo must be a URL"))]
    pub photo: Option<String>,
}

/// Role assignment request (admin only)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// Access and refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Public user profile
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Profile image URL
    pub photo: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&UserIdentity> for UserInfo {
    fn from(identity: &UserIdentity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            first_name: identity.profile.first_name.clone(),
            last_name: identity.profile.last_name.clone(),
            photo: identity.profile.photo.clone(),
            role: identity.role,
            created_at: identity.created_at,
            updated_at: identity.updated_at,
        }
    }
}

impl From<UserIdentity> for UserInfo {
    fn from(identity: UserIdentity) -> Self {
        Self::from(&identity)
    }
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Registration response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserInfo,
}
