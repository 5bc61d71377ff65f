//! JWT token issuance and verification
//!
//! Implements HMAC-SHA256 signed bearer tokens. Access and refresh tokens
//! share the same key and algorithm; they differ only in lifetime and in
//! the `typ` claim, which stops one kind from being accepted as the other.
//!
//! Signing keys carry a `kid`. The codec issues with its current key and
//! also accepts an optional previous key during a rotation window.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use storefront_core::{AuthConfig, Role};
use thiserror::Error;
use uuid::Uuid;

/// Kind of bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims embedded in every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user
    pub user_id: Uuid,
    /// Role at issuance
    pub role: Role,
    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,
    /// Issued at timestamp (Unix epoch seconds)
    pub iat: i64,
    /// Unique token identifier
    pub jti: Uuid,
    /// Access or refresh
    pub typ: TokenKind,
}

impl Claims {
    /// Absolute expiry as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A freshly signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// JWT generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Expected a {expected:?} token")]
    WrongTokenKind { expected: TokenKind },

    #[error("No signing secret configured")]
    MissingKey,

    #[error("Token expiry out of range")]
    ExpiryOutOfRange,
}

struct SigningKey {
    kid: String,
    secret: SecretString,
}

impl SigningKey {
    fn new(kid: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            kid: kid.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.expose_secret().as_bytes())
    }
}

/// Signs and verifies access and refresh tokens
///
/// Pure with respect to (claims, key, time): the only state is the
/// injected key material and lifetimes, so a single instance can be shared
/// across requests. Secrets are zeroized when the codec is dropped.
pub struct TokenCodec {
    current: SigningKey,
    previous: Option<SigningKey>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    leeway_secs: i64,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("kid", &self.current.kid)
            .field("previous_kid", &self.previous.as_ref().map(|k| &k.kid))
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec with the default lifetimes (15 minutes / 7 days)
    pub fn new(kid: impl Into<String>, secret: impl Into<String>) -> Self {
        let defaults = AuthConfig::default();
        Self {
            current: SigningKey::new(kid, secret),
            previous: None,
            access_ttl: seconds(defaults.access_ttl_secs),
            refresh_ttl: seconds(defaults.refresh_ttl_secs),
            leeway_secs: clamp_secs(defaults.leeway_secs),
        }
    }

    /// Build a codec from configuration
    pub fn from_config(config: &AuthConfig) -> Result<Self, JwtError> {
        let secret = config
            .jwt_secret
            .as_ref()
            .ok_or(JwtError::MissingKey)?
            .expose_secret();

        let mut codec = Self::new(config.jwt_key_id.as_str(), secret)
            .with_ttls(config.access_ttl_secs, config.refresh_ttl_secs)
            .with_leeway(config.leeway_secs);

        if let Some(previous) = config.jwt_previous_secret.as_ref() {
            codec = codec.with_previous_key(
                config.jwt_previous_key_id.as_str(),
                previous.expose_secret(),
            );
        }

        Ok(codec)
    }

    /// Accept tokens signed by a retired key until they expire
    pub fn with_previous_key(mut self, kid: impl Into<String>, secret: impl Into<String>) -> Self {
        self.previous = Some(SigningKey::new(kid, secret));
        self
    }

    /// Set both lifetimes; values beyond what `chrono` can represent saturate
    pub fn with_ttls(mut self, access_secs: u64, refresh_secs: u64) -> Self {
        self.access_ttl = seconds(access_secs);
        self.refresh_ttl = seconds(refresh_secs);
        self
    }

    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = clamp_secs(leeway_secs);
        self
    }

    /// Lifetime of tokens of the given kind
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Issue a token that expires `ttl(kind)` from now
    pub fn issue(&self, user_id: Uuid, role: Role, kind: TokenKind) -> Result<IssuedToken, JwtError> {
        self.issue_at(user_id, role, kind, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(
        &self,
        user_id: Uuid,
        role: Role,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, JwtError> {
        let expires_at = now
            .checked_add_signed(self.ttl(kind))
            .ok_or(JwtError::ExpiryOutOfRange)?;

        let claims = Claims {
            user_id,
            role,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            typ: kind,
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.current.kid.clone());

        let token = encode(&header, &claims, &self.current.encoding_key())?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify a token of the expected kind against the current time
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, JwtError> {
        self.verify_at(token, kind, Utc::now())
    }

    /// Verify a token of the expected kind as if the current time were `now`
    ///
    /// The signature is checked before anything in the payload is trusted.
    /// A token is expired once `now > exp + leeway`.
    pub fn verify_at(
        &self,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, JwtError> {
        let header = decode_header(token).map_err(|_| JwtError::InvalidToken)?;
        if header.alg != Algorithm::HS256 {
            return Err(JwtError::InvalidToken);
        }

        let key = self
            .key_for(header.kid.as_deref())
            .ok_or(JwtError::InvalidSignature)?;

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the caller's clock
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<Claims>(token, &key.decoding_key(), &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken,
            })?
            .claims;

        if claims.typ != kind {
            return Err(JwtError::WrongTokenKind { expected: kind });
        }

        if now.timestamp() > claims.exp.saturating_add(self.leeway_secs) {
            return Err(JwtError::ExpiredToken);
        }

        Ok(claims)
    }

    fn key_for(&self, kid: Option<&str>) -> Option<&SigningKey> {
        let kid = kid?;
        if kid == self.current.kid {
            return Some(&self.current);
        }
        self.previous.as_ref().filter(|k| k.kid == kid)
    }
}

fn clamp_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

fn seconds(secs: u64) -> Duration {
    Duration::try_seconds(clamp_secs(secs)).unwrap_or(Duration::MAX)
}
