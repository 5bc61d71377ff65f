//! Authentication middleware for protecting routes
//!
//! Extracts and validates bearer access tokens from the Authorization header.
//! On success, binds the `Principal` to the request extensions.
use super::jwt::{JwtError, TokenKind};
use super::models::Principal;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use storefront_core::Role;
use thiserror::Error;

/// Authentication middleware errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// No Authorization header, or not of the form `Bearer <token>`
    #[error("Missing or malformed Authorization header")]
    MissingCredential,

    /// Token failed verification; the cause is kept for logging only
    #[error("Invalid credential: {0}")]
    InvalidCredential(#[from] JwtError),

    #[error("Insufficient role")]
    InsufficientRole,

    /// Middleware composed in the wrong order
    #[error("Precondition violated: {0}")]
    PreconditionViolated(&'static str),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            // Missing and rejected credentials share one body
            AuthError::MissingCredential | AuthError::InvalidCredential(_) => {
                (StatusCode::UNAUTHORIZED, ApiError::unauthorized())
            }
            AuthError::InsufficientRole => (StatusCode::FORBIDDEN, ApiError::forbidden()),
            AuthError::PreconditionViolated(reason) => {
                tracing::error!(reason, "Authorization stage reached without a principal");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
            }
        };

        (status, Json(error)).into_response()
    }
}

/// Authentication middleware that requires a valid access token
///
/// This middleware:
/// 1. Extracts the Authorization header
/// 2. Requires the `Bearer ` prefix
/// 3. Verifies signature, token kind and expiry with the shared codec
/// 4. Adds `Principal` to request extensions
///
/// Every verification failure maps to the same client response; the precise
/// reason goes to the audit log.
///
/// # Usage
///
/// ```ignore
/// use axum::{Router, routing::get, middleware};
/// use storefront_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/auth/me", get(me_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(&request)?;

    let claims = match state.codec.verify(token, TokenKind::Access) {
        Ok(c) => c,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
                reason: e.to_string(),
            });
            return Err(AuthError::InvalidCredential(e));
        }
    };

    if request.extensions().get::<Principal>().is_some() {
        return Err(AuthError::PreconditionViolated("principal already bound"));
    }
    request.extensions_mut().insert(Principal::from(&claims));

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request<Body>) -> Result<&str, AuthError> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MissingCredential)?
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingCredential)
}

/// Type alias for role middleware future
type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// Middleware factory for role-based access control
///
/// Passes the request on only if the principal's role is one of
/// `allowed_roles`. Membership is exact: listing `Role::Shop` does not admit
/// `Role::Admin`. Must be layered inside `auth_middleware`.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::get, middleware};
/// use storefront_api::auth::middleware::{auth_middleware, require_role};
///
/// let app = Router::new()
///     .route("/users", get(list_users))
///     .route_layer(middleware::from_fn(require_role(&[Role::Admin])))
///     .route_layer(middleware::from_fn_with_state(state, auth_middleware));
/// ```
pub fn require_role(
    allowed_roles: &'static [Role],
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let principal = *request
                .extensions()
                .get::<Principal>()
                .ok_or(AuthError::PreconditionViolated("role check without principal"))?;

            if !allowed_roles.contains(&principal.role) {
                let required = allowed_roles
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join(",");

                audit_log(&AuditEvent::AccessDenied {
                    user_id: Some(principal.user_id),
                    role: Some(principal.role),
                    resource: request.uri().path().to_string(),
                    required_roles: Some(required),
                    ip_address: extract_ip_address(request.headers()),
                    user_agent: extract_user_agent(request.headers()),
                });

                return Err(AuthError::InsufficientRole);
            }

            Ok(next.run(request).await)
        })
    }
}
