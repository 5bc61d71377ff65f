//! Storefront API - authentication and authorization service
//!
//! Provides HTTP endpoints for account registration, login, token refresh,
//! logout and role-gated account management.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::{http::HeaderValue, Router};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document for the service
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront Auth API",
        description = "Authentication, session rotation and role-based access control",
    ),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "auth", description = "Registration, login, refresh and logout"),
        (name = "users", description = "Account management")
    ),
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::refresh_handler,
        handlers::auth::logout_handler,
        handlers::auth::me_handler,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::set_role,
        handlers::users::delete_user,
    ),
    components(
        schemas(
            handlers::health::HealthResponse,
            handlers::health::ReadinessResponse,
            handlers::health::ReadinessChecks,
            error::ApiError,
            auth::RegisterRequest,
            auth::RegisterResponse,
            auth::LoginRequest,
            auth::RefreshRequest,
            auth::TokenPair,
            auth::UserInfo,
            auth::UpdateUserRequest,
            auth::SetRoleRequest,
            auth::MessageResponse,
            storefront_core::Role,
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the application router
///
/// Mounts the API routes, Swagger UI and the OpenAPI document, with request
/// tracing and the CORS policy for `cors_origins`.
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(routes::api_routes(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Build the CORS layer
///
/// An empty list allows no cross-origin requests. `*` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS allows any origin");
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.trim().parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

/// Signing secret used by the testing router
#[cfg(any(test, feature = "test-utils"))]
pub const TEST_JWT_SECRET: &str = "storefront-test-signing-secret-0123456789";

/// Create a router and its state backed by the in-memory store
///
/// Uses a fixed signing secret and lightweight Argon2 parameters.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    use auth::{CredentialVerifier, PasswordConfig, TokenCodec};
    use storefront_core::MemoryIdentityStore;

    let state = Arc::new(AppState::new(
        Arc::new(MemoryIdentityStore::new()),
        TokenCodec::new("test", TEST_JWT_SECRET),
        CredentialVerifier::new(PasswordConfig::lightweight()),
    ));

    (create_router(state.clone(), &[]), state)
}

/// Create a router for integration testing
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_test_app().0
}
