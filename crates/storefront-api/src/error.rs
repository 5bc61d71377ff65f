//! API error handling

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use storefront_core::StorefrontError;
use utoipa::ToSchema;
use validator::Validate;

/// Message of every authentication failure past the header check
pub const INVALID_CREDENTIALS: &str = "Invalid or expired credentials";

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", INVALID_CREDENTIALS)
    }

    pub fn forbidden() -> Self {
        Self::new("FORBIDDEN", "Access denied")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Conflict(String),
    Internal(String),
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, ApiError::unauthorized()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, ApiError::forbidden()),
            AppError::NotFound(resource) => (StatusCode::NOT_FOUND, ApiError::not_found(&resource)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ApiError::conflict(msg)),
            AppError::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
            }
            AppError::Database(detail) => {
                tracing::error!(detail = %detail, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorefrontError> for AppError {
    fn from(err: StorefrontError) -> Self {
        match err {
            StorefrontError::NotFound(resource) => AppError::NotFound(resource),
            StorefrontError::Conflict(msg) => AppError::Conflict(msg),
            StorefrontError::ValidationError(msg) => AppError::Validation(msg),
            StorefrontError::DatabaseError(msg) => AppError::Database(msg),
            StorefrontError::ConfigError(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            StorefrontError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

/// JSON body extractor that also runs `validator` rules
///
/// Malformed JSON, missing fields and rule violations are all reported as
/// `400 BAD_REQUEST`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_internal_details_are_not_echoed() {
        let response = AppError::Database("password authentication failed for user app".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert!(!json.to_string().contains("password authentication"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AppError::Forbidden, StatusCode::FORBIDDEN, "FORBIDDEN"),
            (AppError::NotFound("User".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT, "CONFLICT"),
        ];

        for (error, status, code) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), status);
            assert_eq!(body_json(response).await["code"], code);
        }
    }

    #[tokio::test]
    async fn test_unauthorized_message_is_uniform() {
        let json = body_json(AppError::Unauthorized.into_response()).await;
        assert_eq!(json["message"], INVALID_CREDENTIALS);
    }

    #[test]
    fn test_from_storefront_error() {
        assert!(matches!(
            AppError::from(StorefrontError::Conflict("Email already registered".into())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(StorefrontError::DatabaseError("down".into())),
            AppError::Database(_)
        ));
    }
}
