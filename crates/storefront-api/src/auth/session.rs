//! Per-user refresh session slot
//!
//! Each identity has exactly one slot. It is `Empty` after registration and
//! logout and `Active` after login or refresh. Rotation is a conditional
//! write keyed on the digest observed when the slot was read, so two
//! requests racing on the same old token cannot both win.

use super::jwt::IssuedToken;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use storefront_core::{IdentityRepository, RefreshSlot, StorefrontError};
use thiserror::Error;
use uuid::Uuid;

/// Why a presented refresh token was not accepted
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Refresh token does not match the active session")]
    TokenMismatch,

    #[error("Session has expired")]
    SessionExpired,

    #[error("Session changed concurrently")]
    Superseded,

    #[error(transparent)]
    Store(#[from] StorefrontError),
}

impl SessionError {
    /// Whether the error is a rejected credential rather than a store failure
    pub fn is_rejection(&self) -> bool {
        !matches!(self, SessionError::Store(_))
    }
}

/// SHA-256 hex digest of a refresh token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Reads and rotates refresh slots through the identity repository
#[derive(Clone)]
pub struct SessionStore {
    repo: Arc<dyn IdentityRepository>,
}

impl SessionStore {
    pub fn new(repo: Arc<dyn IdentityRepository>) -> Self {
        Self { repo }
    }

    /// Check a presented refresh token against a slot read from the store
    ///
    /// Never writes. A slot is usable until `now` passes its expiry.
    pub fn check(slot: &RefreshSlot, presented: &str, now: DateTime<Utc>) -> Result<(), SessionError> {
        let RefreshSlot::Active {
            token_hash,
            expires_at,
        } = slot
        else {
            return Err(SessionError::NoActiveSession);
        };

        if *token_hash != hash_token(presented) {
            return Err(SessionError::TokenMismatch);
        }

        if now > *expires_at {
            return Err(SessionError::SessionExpired);
        }

        Ok(())
    }

    /// Install `refresh` as the active session if the slot still holds
    /// `expected_hash` (`None` for the empty slot)
    pub async fn rotate(
        &self,
        user_id: Uuid,
        expected_hash: Option<&str>,
        refresh: &IssuedToken,
    ) -> Result<(), SessionError> {
        let slot = RefreshSlot::Active {
            token_hash: hash_token(&refresh.token),
            expires_at: refresh.claims.expires_at(),
        };

        if self
            .repo
            .replace_refresh_slot(user_id, expected_hash, slot)
            .await?
        {
            Ok(())
        } else {
            Err(SessionError::Superseded)
        }
    }

    /// Empty the slot unconditionally
    ///
    /// Clearing the slot of an identity that no longer exists is a no-op.
    pub async fn clear(&self, user_id: Uuid) -> Result<(), SessionError> {
        match self.repo.set_refresh_slot(user_id, RefreshSlot::Empty).await {
            Ok(()) | Err(StorefrontError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
