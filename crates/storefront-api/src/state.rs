//! Application state management

use crate::auth::{AuthService, CredentialVerifier, TokenCodec};
use std::sync::Arc;
use std::time::Instant;
use storefront_core::IdentityRepository;

/// Application state shared across handlers
pub struct AppState {
    /// Server start time
    pub start_time: Instant,
    /// Identity persistence
    pub repo: Arc<dyn IdentityRepository>,
    /// Token signing and verification
    pub codec: Arc<TokenCodec>,
    /// Authentication flows
    pub auth: AuthService,
}

impl AppState {
    /// Create new application state
    pub fn new(
        repo: Arc<dyn IdentityRepository>,
        codec: TokenCodec,
        verifier: CredentialVerifier,
    ) -> Self {
        let codec = Arc::new(codec);
        Self {
            start_time: Instant::now(),
            auth: AuthService::new(repo.clone(), codec.clone(), verifier),
            repo,
            codec,
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
