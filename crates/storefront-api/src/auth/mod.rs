//! Authentication and authorization module
//!
//! This module provides JWT-based authentication with the following components:
//! - Token issuance and verification (`jwt`)
//! - Password hashing with Argon2 (`password`)
//! - The per-user refresh session slot (`session`)
//! - Middleware for request authentication and role gates (`middleware`)
//! - The owner-or-role authorization decision (`policy`)
//! - Authentication flows and account management (`service`)

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod policy;
pub mod service;
pub mod session;

pub use jwt::{Claims, IssuedToken, JwtError, TokenCodec, TokenKind};
pub use middleware::{auth_middleware, require_role, AuthError};
pub use models::{
    LoginRequest, MessageResponse, Principal, RefreshRequest, RegisterRequest, RegisterResponse,
    SetRoleRequest, TokenPair, UpdateUserRequest, UserInfo,
};
pub use password::{CredentialVerifier, PasswordConfig};
pub use policy::{decide, Decision};
pub use service::AuthService;
pub use session::{hash_token, SessionError, SessionStore};
