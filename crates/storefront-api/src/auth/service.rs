//! Authentication service layer
//!
//! Provides the register, login, refresh and logout flows, plus the
//! account management operations that touch identity state. Composes the
//! credential verifier, token codec and session store over one identity
//! repository.

use super::jwt::{IssuedToken, TokenCodec, TokenKind};
use super::models::{
    normalize_email, LoginRequest, Principal, RefreshRequest, RegisterRequest, TokenPair,
    UpdateUserRequest, UserInfo,
};
use super::password::{validate_password_strength, CredentialVerifier};
use super::policy::decide;
use super::session::{SessionError, SessionStore};
use crate::audit::{audit_log, AuditContext, AuditEvent};
use crate::error::AppError;
use chrono::Utc;
use std::sync::Arc;
use storefront_core::{
    IdentityRepository, IdentityUpdate, NewIdentity, Profile, Role, StorefrontError,
    UserIdentity,
};
use uuid::Uuid;

/// Roles that may act on any account, regardless of ownership
const ACCOUNT_ADMIN_ROLES: &[Role] = &[Role::Admin];

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn IdentityRepository>,
    codec: Arc<TokenCodec>,
    sessions: SessionStore,
    verifier: CredentialVerifier,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        repo: Arc<dyn IdentityRepository>,
        codec: Arc<TokenCodec>,
        verifier: CredentialVerifier,
    ) -> Self {
        Self {
            sessions: SessionStore::new(repo.clone()),
            repo,
            codec,
            verifier,
        }
    }

    /// Register a new customer account
    ///
    /// The refresh slot starts empty. A taken email fails with `Conflict`.
    pub async fn register(
        &self,
        request: RegisterRequest,
        ctx: &AuditContext,
    ) -> Result<UserInfo, AppError> {
        let email = normalize_email(&request.email);

        validate_password_strength(&request.password).map_err(AppError::Validation)?;

        let password_hash = self.hash_password(request.password).await?;

        let identity = match self
            .repo
            .create(NewIdentity {
                email: email.clone(),
                password_hash,
                role: Role::Customer,
                profile: Profile::default(),
            })
            .await
        {
            Ok(identity) => identity,
            Err(e) => {
                audit_log(&AuditEvent::RegistrationFailure {
                    email,
                    reason: e.to_string(),
                    ip_address: ctx.ip_address.clone(),
                    user_agent: ctx.user_agent.clone(),
                });
                return Err(e.into());
            }
        };

        audit_log(&AuditEvent::RegistrationSuccess {
            user_id: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });

        Ok(identity.into())
    }

    /// Login with email and password
    ///
    /// An unknown email and a wrong password produce the same error and
    /// cost the same Argon2 work. On success the refresh slot is rotated to
    /// the newly issued refresh token.
    pub async fn login(
        &self,
        request: LoginRequest,
        ctx: &AuditContext,
    ) -> Result<TokenPair, AppError> {
        let email = normalize_email(&request.email);
        let identity = self.repo.find_by_email(&email).await?;

        let stored_hash = identity.as_ref().map(|i| i.password_hash.clone());
        let verified = self.verify_password(request.password, stored_hash).await?;

        let identity = match identity {
            Some(identity) if verified => identity,
            other => {
                let reason = if other.is_some() {
                    "wrong password"
                } else {
                    "unknown email"
                };
                audit_log(&AuditEvent::LoginFailure {
                    email,
                    reason: reason.to_string(),
                    ip_address: ctx.ip_address.clone(),
                    user_agent: ctx.user_agent.clone(),
                });
                return Err(AppError::Unauthorized);
            }
        };

        let (access, refresh) = self.issue_pair(&identity)?;

        if let Err(e) = self
            .sessions
            .rotate(identity.id, identity.refresh_slot.token_hash(), &refresh)
            .await
        {
            if e.is_rejection() {
                audit_log(&AuditEvent::LoginFailure {
                    email,
                    reason: e.to_string(),
                    ip_address: ctx.ip_address.clone(),
                    user_agent: ctx.user_agent.clone(),
                });
            }
            return Err(session_error(e));
        }

        audit_log(&AuditEvent::LoginSuccess {
            user_id: identity.id,
            email: identity.email.clone(),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });

        Ok(self.token_pair(access, refresh))
    }

    /// Exchange a refresh token for a new pair
    ///
    /// The token must verify, its subject must exist, and it must be the
    /// one held in the subject's active, unexpired slot. Any failure leaves
    /// the slot untouched. The new pair carries the role currently stored
    /// for the identity.
    pub async fn refresh(
        &self,
        request: RefreshRequest,
        ctx: &AuditContext,
    ) -> Result<TokenPair, AppError> {
        let presented = request.refresh_token;

        let claims = match self.codec.verify(&presented, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(e) => return Err(self.reject_refresh(None, e.to_string(), ctx)),
        };

        let Some(identity) = self.repo.find_by_id(claims.user_id).await? else {
            return Err(self.reject_refresh(Some(claims.user_id), "unknown subject".to_string(), ctx));
        };

        if let Err(e) = SessionStore::check(&identity.refresh_slot, &presented, Utc::now()) {
            return Err(self.reject_refresh(Some(identity.id), e.to_string(), ctx));
        }

        let (access, refresh) = self.issue_pair(&identity)?;

        match self
            .sessions
            .rotate(identity.id, identity.refresh_slot.token_hash(), &refresh)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_rejection() => {
                return Err(self.reject_refresh(Some(identity.id), e.to_string(), ctx));
            }
            Err(e) => return Err(session_error(e)),
        }

        audit_log(&AuditEvent::TokenRefresh {
            user_id: identity.id,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });

        Ok(self.token_pair(access, refresh))
    }

    /// Clear the principal's refresh session
    ///
    /// Access tokens already issued stay valid until they expire.
    pub async fn logout(&self, principal: &Principal, ctx: &AuditContext) -> Result<(), AppError> {
        self.sessions
            .clear(principal.user_id)
            .await
            .map_err(session_error)?;

        audit_log(&AuditEvent::Logout {
            user_id: principal.user_id,
            ip_address: ctx.ip_address.clone(),
        });

        Ok(())
    }

    /// Profile of the principal
    pub async fn current_user(&self, principal: &Principal) -> Result<UserInfo, AppError> {
        self.find(principal.user_id).await.map(UserInfo::from)
    }

    /// All accounts, oldest first
    pub async fn list_users(&self) -> Result<Vec<UserInfo>, AppError> {
        let identities = self.repo.list().await?;
        Ok(identities.iter().map(UserInfo::from).collect())
    }

    /// Profile of one account (owner or admin)
    pub async fn get_user(
        &self,
        principal: &Principal,
        user_id: Uuid,
        ctx: &AuditContext,
    ) -> Result<UserInfo, AppError> {
        self.authorize(principal, user_id, ctx)?;
        self.find(user_id).await.map(UserInfo::from)
    }

    /// Change email and/or password (owner or admin)
    ///
    /// A password change also ends the account's refresh session.
    pub async fn update_user(
        &self,
        principal: &Principal,
        user_id: Uuid,
        request: UpdateUserRequest,
        ctx: &AuditContext,
    ) -> Result<UserInfo, AppError> {
        self.authorize(principal, user_id, ctx)?;

        let password_hash = match request.password {
            Some(password) => {
                validate_password_strength(&password).map_err(AppError::Validation)?;
                Some(self.hash_password(password).await?)
            }
            None => None,
        };
        let password_changed = password_hash.is_some();

        let update = IdentityUpdate {
            email: request.email.as_deref().map(normalize_email),
            password_hash,
            role: None,
            first_name: request.first_name.map(|s| s.trim().to_string()),
            last_name: request.last_name.map(|s| s.trim().to_string()),
            photo: request.photo,
        };
        if update.is_empty() {
            return Err(AppError::Validation("No fields to update".to_string()));
        }

        let identity = self.repo.update(user_id, update).await?;

        if password_changed {
            self.sessions.clear(user_id).await.map_err(session_error)?;
        }

        Ok(identity.into())
    }

    /// Assign a role; callers are gated to admins by the route
    pub async fn set_role(
        &self,
        principal: &Principal,
        user_id: Uuid,
        role: Role,
        ctx: &AuditContext,
    ) -> Result<UserInfo, AppError> {
        let old_role = self.find(user_id).await?.role;

        let identity = self
            .repo
            .update(
                user_id,
                IdentityUpdate {
                    role: Some(role),
                    ..Default::default()
                },
            )
            .await?;

        audit_log(&AuditEvent::RoleChanged {
            user_id,
            changed_by: principal.user_id,
            old_role,
            new_role: identity.role,
            ip_address: ctx.ip_address.clone(),
        });

        Ok(identity.into())
    }

    /// Delete an account (owner or admin)
    pub async fn delete_user(
        &self,
        principal: &Principal,
        user_id: Uuid,
        ctx: &AuditContext,
    ) -> Result<(), AppError> {
        self.authorize(principal, user_id, ctx)?;

        if !self.repo.delete(user_id).await? {
            return Err(AppError::NotFound("User".to_string()));
        }

        audit_log(&AuditEvent::AccountDeleted {
            user_id,
            deleted_by: principal.user_id,
            ip_address: ctx.ip_address.clone(),
        });

        Ok(())
    }

    /// Create the first admin account if none exists
    ///
    /// Returns `None` when an admin already exists or the email is taken by
    /// a non-admin account, which is left unchanged.
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: String,
    ) -> Result<Option<UserInfo>, AppError> {
        if self.repo.exists_with_role(Role::Admin).await? {
            return Ok(None);
        }

        validate_password_strength(&password).map_err(AppError::Validation)?;
        let password_hash = self.hash_password(password).await?;

        match self
            .repo
            .create(NewIdentity {
                email: normalize_email(email),
                password_hash,
                role: Role::Admin,
                profile: Profile::default(),
            })
            .await
        {
            Ok(identity) => Ok(Some(identity.into())),
            Err(StorefrontError::Conflict(_)) => {
                tracing::warn!(email, "Bootstrap admin email belongs to an existing account");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn authorize(
        &self,
        principal: &Principal,
        user_id: Uuid,
        ctx: &AuditContext,
    ) -> Result<(), AppError> {
        if decide(principal, Some(user_id), ACCOUNT_ADMIN_ROLES).is_allowed() {
            return Ok(());
        }

        audit_log(&AuditEvent::AccessDenied {
            user_id: Some(principal.user_id),
            role: Some(principal.role),
            resource: format!("user:{user_id}"),
            required_roles: Some("owner,admin".to_string()),
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });

        Err(AppError::Forbidden)
    }

    async fn find(&self, user_id: Uuid) -> Result<UserIdentity, AppError> {
        self.repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    fn issue_pair(&self, identity: &UserIdentity) -> Result<(IssuedToken, IssuedToken), AppError> {
        let issue = |kind| {
            self.codec
                .issue(identity.id, identity.role, kind)
                .map_err(|e| AppError::Internal(format!("Failed to issue token: {e}")))
        };
        Ok((issue(TokenKind::Access)?, issue(TokenKind::Refresh)?))
    }

    fn token_pair(&self, access: IssuedToken, refresh: IssuedToken) -> TokenPair {
        TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "Bearer".to_string(),
            expires_in: self.codec.ttl(TokenKind::Access).num_seconds(),
        }
    }

    fn reject_refresh(&self, user_id: Option<Uuid>, reason: String, ctx: &AuditContext) -> AppError {
        audit_log(&AuditEvent::RefreshRejected {
            user_id,
            reason,
            ip_address: ctx.ip_address.clone(),
            user_agent: ctx.user_agent.clone(),
        });
        AppError::Unauthorized
    }

    /// Argon2 runs on the blocking pool
    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let verifier = self.verifier.clone();
        tokio::task::spawn_blocking(move || verifier.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    async fn verify_password(
        &self,
        password: String,
        stored_hash: Option<String>,
    ) -> Result<bool, AppError> {
        let verifier = self.verifier.clone();
        tokio::task::spawn_blocking(move || verifier.verify_or_decoy(&password, stored_hash.as_deref()))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {e}")))?
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}

fn session_error(e: SessionError) -> AppError {
    match e {
        SessionError::Store(e) => e.into(),
        _ => AppError::Unauthorized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::PasswordConfig;
    use crate::auth::session::hash_token;
    use chrono::Duration;
    use storefront_core::{MemoryIdentityStore, RefreshSlot};

    const SECRET: &str = "service-test-secret-at-least-32-bytes!!";

    struct Fixture {
        repo: Arc<MemoryIdentityStore>,
        service: AuthService,
        ctx: AuditContext,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(MemoryIdentityStore::new());
        let service = AuthService::new(
            repo.clone(),
            Arc::new(TokenCodec::new("test", SECRET)),
            CredentialVerifier::new(PasswordConfig::lightweight()),
        );
        Fixture {
            repo,
            service,
            ctx: AuditContext::default(),
        }
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "password123".to_string(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn refresh_request(token: &str) -> RefreshRequest {
        RefreshRequest {
            refresh_token: token.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_customer_with_empty_slot() {
        let f = fixture();
        let user = f
            .service
            .register(register_request(" Alice@Example.com "), &f.ctx)
            .await
            .unwrap();

        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, Role::Customer);

        let stored = f.repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_slot, RefreshSlot::Empty);
        assert_ne!(stored.password_hash, "password123");
    }

    #[tokio::test]
    async fn test_register_duplicate_conflicts() {
        let f = fixture();
        f.service
            .register(register_request("alice@example.com"), &f.ctx)
            .await
            .unwrap();

        let result = f
            .service
            .register(register_request("ALICE@example.com"), &f.ctx)
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_login_token_carries_stored_role() {
        let f = fixture();
        let user = f
            .service
            .register(register_request("alice@example.com"), &f.ctx)
            .await
            .unwrap();

        let pair = f
            .service
            .login(login_request("alice@example.com", "password123"), &f.ctx)
            .await
            .unwrap();

        let claims = f
            .service
            .codec
            .verify(&pair.access_token, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.role, Role::Customer);
        assert_eq!(pair.expires_in, 900);

        let stored = f.repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(
            stored.refresh_slot.token_hash(),
            Some(hash_token(&pair.refresh_token).as_str())
        );
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let f = fixture();
        f.service
            .register(register_request("alice@example.com"), &f.ctx)
            .await
            .unwrap();

        let wrong_password = f
            .service
            .login(login_request("alice@example.com", "password124"), &f.ctx)
            .await;
        let unknown_email = f
            .service
            .login(login_request("bob@example.com", "password123"), &f.ctx)
            .await;

        assert!(matches!(wrong_password, Err(AppError::Unauthorized)));
        assert!(matches!(unknown_email, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_refresh_rotation_and_logout() {
        let f = fixture();
        f.service
            .register(register_request("alice@example.com"), &f.ctx)
            .await
            .unwrap();
        let first = f
            .service
            .login(login_request("alice@example.com", "password123"), &f.ctx)
            .await
            .unwrap();

        let second = f
            .service
            .refresh(refresh_request(&first.refresh_token), &f.ctx)
            .await
            .unwrap();
        assert_ne!(second.access_token, first.access_token);
        assert_ne!(second.refresh_token, first.refresh_token);

        // Superseded token
        let reuse = f
            .service
            .refresh(refresh_request(&first.refresh_token), &f.ctx)
            .await;
        assert!(matches!(reuse, Err(AppError::Unauthorized)));

        // The failed attempt did not disturb the active session
        let third = f
            .service
            .refresh(refresh_request(&second.refresh_token), &f.ctx)
            .await
            .unwrap();

        let claims = f
            .service
            .codec
            .verify(&third.access_token, TokenKind::Access)
            .unwrap();
        let principal = Principal::from(&claims);
        f.service.logout(&principal, &f.ctx).await.unwrap();

        let after_logout = f
            .service
            .refresh(refresh_request(&third.refresh_token), &f.ctx)
            .await;
        assert!(matches!(after_logout, Err(AppError::Unauthorized)));

        // Logout does not revoke outstanding access tokens
        assert!(f
            .service
            .codec
            .verify(&third.access_token, TokenKind::Access)
            .is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_has_one_winner() {
        let f = fixture();
        f.service
            .register(register_request("alice@example.com"), &f.ctx)
            .await
            .unwrap();
        let mut current = f
            .service
            .login(login_request("alice@example.com", "password123"), &f.ctx)
            .await
            .unwrap()
            .refresh_token;

        for _ in 0..5 {
            let (a, b) = tokio::join!(
                f.service.refresh(refresh_request(&current), &f.ctx),
                f.service.refresh(refresh_request(&current), &f.ctx),
            );

            let (winner, loser) = match (a, b) {
                (Ok(pair), Err(e)) | (Err(e), Ok(pair)) => (pair, e),
                (a, b) => panic!("expected exactly one success, got {a:?} and {b:?}"),
            };
            assert!(matches!(loser, AppError::Unauthorized));

            // The slot holds the winner's token, which keeps working
            current = f
                .service
                .refresh(refresh_request(&winner.refresh_token), &f.ctx)
                .await
                .unwrap()
                .refresh_token;
        }
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token_and_expired_slot() {
        let f = fixture();
        let user = f
            .service
            .register(register_request("alice@example.com"), &f.ctx)
            .await
            .unwrap();
        let pair = f
            .service
            .login(login_request("alice@example.com", "password123"), &f.ctx)
            .await
            .unwrap();

        let with_access = f
            .service
            .refresh(refresh_request(&pair.access_token), &f.ctx)
            .await;
        assert!(matches!(with_access, Err(AppError::Unauthorized)));

        // Slot expired although the token itself has not
        let expired_slot = RefreshSlot::Active {
            token_hash: hash_token(&pair.refresh_token),
            expires_at: Utc::now() - Duration::seconds(1),
        };
        f.repo
            .set_refresh_slot(user.id, expired_slot.clone())
            .await
            .unwrap();

        let result = f
            .service
            .refresh(refresh_request(&pair.refresh_token), &f.ctx)
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));

        let stored = f.repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_slot, expired_slot);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_role_change() {
        let f = fixture();
        let user = f
            .service
            .register(register_request("shop@example.com"), &f.ctx)
            .await
            .unwrap();
        let pair = f
            .service
            .login(login_request("shop@example.com", "password123"), &f.ctx)
            .await
            .unwrap();

        let admin = Principal {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        f.service
            .set_role(&admin, user.id, Role::Shop, &f.ctx)
            .await
            .unwrap();

        let refreshed = f
            .service
            .refresh(refresh_request(&pair.refresh_token), &f.ctx)
            .await
            .unwrap();
        let claims = f
            .service
            .codec
            .verify(&refreshed.access_token, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.role, Role::Shop);
    }

    #[tokio::test]
    async fn test_account_access_owner_or_admin() {
        let f = fixture();
        let alice = f
            .service
            .register(register_request("alice@example.com"), &f.ctx)
            .await
            .unwrap();
        let bob = f
            .service
            .register(register_request("bob@example.com"), &f.ctx)
            .await
            .unwrap();

        let as_alice = Principal {
            user_id: alice.id,
            role: Role::Customer,
        };
        let as_admin = Principal {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
        };

        assert!(f.service.get_user(&as_alice, alice.id, &f.ctx).await.is_ok());
        assert!(matches!(
            f.service.get_user(&as_alice, bob.id, &f.ctx).await,
            Err(AppError::Forbidden)
        ));
        assert!(f.service.get_user(&as_admin, bob.id, &f.ctx).await.is_ok());
        assert!(matches!(
            f.service.get_user(&as_admin, Uuid::new_v4(), &f.ctx).await,
            Err(AppError::NotFound(_))
        ));

        assert!(matches!(
            f.service.delete_user(&as_alice, bob.id, &f.ctx).await,
            Err(AppError::Forbidden)
        ));
        f.service.delete_user(&as_admin, bob.id, &f.ctx).await.unwrap();
        assert!(f.repo.find_by_id(bob.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_change_ends_session() {
        let f = fixture();
        let alice = f
            .service
            .register(register_request("alice@example.com"), &f.ctx)
            .await
            .unwrap();
        let pair = f
            .service
            .login(login_request("alice@example.com", "password123"), &f.ctx)
            .await
            .unwrap();

        let as_alice = Principal {
            user_id: alice.id,
            role: Role::Customer,
        };
        f.service
            .update_user(
                &as_alice,
                alice.id,
                UpdateUserRequest {
                    password: Some("new-password-456".to_string()),
                    ..Default::default()
                },
                &f.ctx,
            )
            .await
            .unwrap();

        let result = f
            .service
            .refresh(refresh_request(&pair.refresh_token), &f.ctx)
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));

        assert!(f
            .service
            .login(login_request("alice@example.com", "new-password-456"), &f.ctx)
            .await
            .is_ok());

        let empty = f
            .service
            .update_user(&as_alice, alice.id, UpdateUserRequest::default(), &f.ctx)
            .await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_profile_keeps_session() {
        let f = fixture();
        let alice = f
            .service
            .register(register_request("alice@example.com"), &f.ctx)
            .await
            .unwrap();
        assert_eq!(alice.first_name, None);
        let pair = f
            .service
            .login(login_request("alice@example.com", "password123"), &f.ctx)
            .await
            .unwrap();

        let as_alice = Principal {
            user_id: alice.id,
            role: Role::Customer,
        };
        let updated = f
            .service
            .update_user(
                &as_alice,
                alice.id,
                UpdateUserRequest {
                    first_name: Some(" Alice ".to_string()),
                    photo: Some("https://cdn.example.com/alice.png".to_string()),
                    ..Default::default()
                },
                &f.ctx,
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name.as_deref(), Some("Alice"));
        assert_eq!(updated.last_name, None);
        assert_eq!(updated.photo.as_deref(), Some("https://cdn.example.com/alice.png"));
        assert_eq!(updated.email, "alice@example.com");

        // Only a password change ends the session
        assert!(f
            .service
            .refresh(refresh_request(&pair.refresh_token), &f.ctx)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_runs_once() {
        let f = fixture();

        let created = f
            .service
            .bootstrap_admin("root@example.com", "admin-password".to_string())
            .await
            .unwrap();
        assert_eq!(created.map(|u| u.role), Some(Role::Admin));

        let again = f
            .service
            .bootstrap_admin("other@example.com", "admin-password".to_string())
            .await
            .unwrap();
        assert!(again.is_none());
    }
}
