//! API route definitions

use crate::auth::middleware::{auth_middleware, require_role};
use crate::handlers::{auth, health, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use storefront_core::Role;

const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Create API routes
///
/// Layers run outside-in: `auth_middleware` binds the principal before any
/// `require_role` gate reads it.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler));

    // Admin-only routes
    let admin_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/:id/role", put(users::set_role))
        .route_layer(middleware::from_fn(require_role(ADMIN_ONLY)));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
