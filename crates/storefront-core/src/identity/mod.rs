//! Persisted user identities
//!
//! A `UserIdentity` owns the credentials of one account and the single
//! refresh-session slot for that account. The slot is mutated only by the
//! login, refresh and logout flows; every other field belongs to account
//! management.

mod memory;
mod postgres;

pub use memory::MemoryIdentityStore;
pub use postgres::PgIdentityStore;

use crate::{Result, Role};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Refresh-session slot of a user
///
/// `Empty` is the "no active session" sentinel set at registration and
/// after logout. `Active` holds the SHA-256 digest of the one refresh token
/// that is currently accepted, never the token itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RefreshSlot {
    #[default]
    Empty,
    Active {
        token_hash: String,
        expires_at: DateTime<Utc>,
    },
}

impl RefreshSlot {
    /// Digest stored in the slot, `None` for the empty sentinel
    pub fn token_hash(&self) -> Option<&str> {
        match self {
            RefreshSlot::Empty => None,
            RefreshSlot::Active { token_hash, .. } => Some(token_hash),
        }
    }

    /// Expiry of the active session
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RefreshSlot::Empty => None,
            RefreshSlot::Active { expires_at, .. } => Some(*expires_at),
        }
    }

    /// Rebuild a slot from its two persisted columns
    pub fn from_columns(token_hash: Option<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        match (token_hash, expires_at) {
            (Some(token_hash), Some(expires_at)) => RefreshSlot::Active {
                token_hash,
                expires_at,
            },
            _ => RefreshSlot::Empty,
        }
    }
}

/// Optional display fields of an account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Profile image URL
    pub photo: Option<String>,
}

/// Persisted account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
    /// PHC-format Argon2id digest
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(skip_serializing)]
    pub refresh_slot: RefreshSlot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a new identity
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile: Profile,
}

/// Partial update of account fields
///
/// `None` leaves the field unchanged. The refresh slot is not reachable from
/// here; see `IdentityRepository::set_refresh_slot`.
#[derive(Debug, Clone, Default)]
pub struct IdentityUpdate {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo: Option<String>,
}

impl IdentityUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.photo.is_none()
    }

    /// Write the profile fields present in this update onto `profile`
    pub fn apply_profile(&self, profile: &mut Profile) {
        if let Some(first_name) = &self.first_name {
            profile.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &self.last_name {
            profile.last_name = Some(last_name.clone());
        }
        if let Some(photo) = &self.photo {
            profile.photo = Some(photo.clone());
        }
    }
}

/// Trait for identity persistence
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Store a new identity with an empty refresh slot
    ///
    /// Fails with `StorefrontError::Conflict` if the email is taken.
    async fn create(&self, identity: NewIdentity) -> Result<UserIdentity>;

    /// Get identity by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>>;

    /// Get identity by (normalised) email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>>;

    /// List all identities, oldest first
    async fn list(&self) -> Result<Vec<UserIdentity>>;

    /// Apply an account update and return the new record
    async fn update(&self, id: Uuid, update: IdentityUpdate) -> Result<UserIdentity>;

    /// Delete an identity; returns whether it existed
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Whether any identity holds the given role
    async fn exists_with_role(&self, role: Role) -> Result<bool>;

    /// Overwrite the refresh slot unconditionally
    async fn set_refresh_slot(&self, id: Uuid, slot: RefreshSlot) -> Result<()>;

    /// Conditionally replace the refresh slot
    ///
    /// The write happens only if the stored token digest still equals
    /// `expected_hash` (`None` matches the empty sentinel). Returns `false`
    /// when the slot changed since it was read or the identity is gone.
    async fn replace_refresh_slot(
        &self,
        id: Uuid,
        expected_hash: Option<&str>,
        slot: RefreshSlot,
    ) -> Result<bool>;

    /// Check that the backing store is reachable
    async fn health_check(&self) -> Result<()>;
}
