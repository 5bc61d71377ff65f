//! Storefront Core - identity model, persistence and shared types
//!
//! This crate defines the pieces of the storefront backend that every surface
//! depends on:
//! - The closed `Role` enumeration used for access control
//! - Persisted user identities and their refresh-session slot
//! - The `IdentityRepository` trait with PostgreSQL and in-memory stores
//! - Common error types
//! - Configuration management

pub mod config;
pub mod identity;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
pub use identity::{
    IdentityRepository, IdentityUpdate, MemoryIdentityStore, NewIdentity, PgIdentityStore, Profile,
    RefreshSlot, UserIdentity,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for storefront operations
#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

// ============================================================================
// Roles
// ============================================================================

/// User role
///
/// Closed set of roles. Every newly registered account is a `Customer`;
/// only an `Admin` may assign roles. Roles are compared by exact equality,
/// there is no implied ordering between them.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Shop,
    #[default]
    Customer,
}

impl Role {
    /// Stable string form used in tokens and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Shop => "shop",
            Role::Customer => "customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = StorefrontError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "shop" => Ok(Role::Shop),
            "customer" => Ok(Role::Customer),
            other => Err(StorefrontError::ValidationError(format!(
                "unknown role: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_str() {
        for role in [Role::Admin, Role::Shop, Role::Customer] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!("SHOP".parse::<Role>().unwrap(), Role::Shop);
        assert!("editor".parse::<Role>().is_err());
    }

    #[test]
    fn test_default_role_is_customer() {
        assert_eq!(Role::default(), Role::Customer);
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, "\"admin\"");

        let role: Role = serde_json::from_str("\"shop\"").unwrap();
        assert_eq!(role, Role::Shop);
    }
}
