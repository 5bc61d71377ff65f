//! Security audit logging for authentication events
//!
//! Provides structured audit records for logins, refreshes, logouts,
//! registrations, account changes and access control failures.
//!
//! All audit events are logged at INFO level with the "audit" target,
//! so they can be filtered and routed separately from application logs.
//! Audit records may carry the precise internal reason for a rejection
//! (expired, bad signature, stale refresh token); client responses never do.
//!
//! # Example
//!
//! ```ignore
//! use storefront_api::audit::{audit_log, AuditContext, AuditEvent};
//!
//! let ctx = AuditContext::from_headers(request.headers());
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     email: user.email.clone(),
//!     ip_address: ctx.ip_address.clone(),
//!     user_agent: ctx.user_agent.clone(),
//! });
//! ```

use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use storefront_core::Role;
use tracing::info;
use uuid::Uuid;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful login
    LoginSuccess {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Successful registration
    RegistrationSuccess {
        user_id: Uuid,
        email: String,
        role: Role,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed registration attempt
    RegistrationFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Refresh token exchanged for a new pair
    TokenRefresh {
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Refresh token refused
    RefreshRejected {
        user_id: Option<Uuid>,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Refresh session cleared
    Logout {
        user_id: Uuid,
        ip_address: Option<String>,
    },

    /// Role or ownership check failed
    AccessDenied {
        user_id: Option<Uuid>,
        role: Option<Role>,
        resource: String,
        required_roles: Option<String>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Bearer token failed verification
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },

    /// Role assigned by an administrator
    RoleChanged {
        user_id: Uuid,
        changed_by: Uuid,
        old_role: Role,
        new_role: Role,
        ip_address: Option<String>,
    },

    /// Account removed
    AccountDeleted {
        user_id: Uuid,
        deleted_by: Uuid,
        ip_address: Option<String>,
    },
}

impl AuditEvent {
    fn description(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::TokenRefresh { .. } => "Token refresh",
            AuditEvent::RefreshRejected { .. } => "Token refresh rejected",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::RoleChanged { .. } => "Role changed",
            AuditEvent::AccountDeleted { .. } => "Account deleted",
        }
    }

    /// Subject of the event, when known
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuditEvent::LoginSuccess { user_id, .. }
            | AuditEvent::RegistrationSuccess { user_id, .. }
            | AuditEvent::TokenRefresh { user_id, .. }
            | AuditEvent::Logout { user_id, .. }
            | AuditEvent::RoleChanged { user_id, .. }
            | AuditEvent::AccountDeleted { user_id, .. } => Some(*user_id),
            AuditEvent::RefreshRejected { user_id, .. } | AuditEvent::AccessDenied { user_id, .. } => {
                *user_id
            }
            AuditEvent::LoginFailure { .. }
            | AuditEvent::RegistrationFailure { .. }
            | AuditEvent::InvalidToken { .. } => None,
        }
    }

    fn ip_address(&self) -> Option<&str> {
        match self {
            AuditEvent::LoginSuccess { ip_address, .. }
            | AuditEvent::LoginFailure { ip_address, .. }
            | AuditEvent::RegistrationSuccess { ip_address, .. }
            | AuditEvent::RegistrationFailure { ip_address, .. }
            | AuditEvent::TokenRefresh { ip_address, .. }
            | AuditEvent::RefreshRejected { ip_address, .. }
            | AuditEvent::Logout { ip_address, .. }
            | AuditEvent::AccessDenied { ip_address, .. }
            | AuditEvent::InvalidToken { ip_address, .. }
            | AuditEvent::RoleChanged { ip_address, .. }
            | AuditEvent::AccountDeleted { ip_address, .. } => ip_address.as_deref(),
        }
    }
}

/// Client metadata attached to audit records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditContext {
    /// Client IP address (from proxy headers)
    pub ip_address: Option<String>,
    /// User agent string
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Log a security audit event with structured fields
///
/// The full event is serialized to JSON in the `event` field; the subject
/// and client IP are also emitted as separate fields for filtering:
///
/// ```json
/// {
///   "timestamp": "2025-12-24T10:30:00Z",
///   "event_type": "refresh_rejected",
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "reason": "Refresh token does not match the active session",
///   "ip_address": "192.168.1.1"
/// }
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();

    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        timestamp = %timestamp,
        event = %event_json,
        user_id = ?event.user_id(),
        ip_address = ?event.ip_address(),
        "{}",
        event.description()
    );
}

/// Extract client IP address from request headers
///
/// Checks X-Forwarded-For (first hop), then X-Real-IP.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}

/// Extract user agent from request headers
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
