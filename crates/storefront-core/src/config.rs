//! Storefront configuration management
//!
//! Handles configuration from environment variables and TOML files with
//! development-friendly defaults. The token signing secret is the one value
//! that has no default: `validate()` refuses to start without it.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum accepted length of an HMAC signing secret in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Upper bound for token lifetimes and clock leeway (365 days)
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Token and session configuration
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    /// Check that the configuration can be used to start the service
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.auth.jwt_secret.as_ref().map(|s| s.expose_secret()) {
            None | Some("") => return Err(ConfigError::MissingRequired("JWT_SECRET".to_string())),
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(ConfigError::InvalidValue {
                    key: "JWT_SECRET".to_string(),
                    value: format!("<{} bytes, need at least {MIN_SECRET_LEN}>", secret.len()),
                });
            }
            Some(_) => {}
        }

        if let Some(previous) = self.auth.jwt_previous_secret.as_ref().map(|s| s.expose_secret()) {
            if previous.len() < MIN_SECRET_LEN {
                return Err(ConfigError::InvalidValue {
                    key: "JWT_PREVIOUS_SECRET".to_string(),
                    value: format!("<{} bytes, need at least {MIN_SECRET_LEN}>", previous.len()),
                });
            }
            if self.auth.jwt_previous_key_id == self.auth.jwt_key_id {
                return Err(ConfigError::InvalidValue {
                    key: "JWT_PREVIOUS_KEY_ID".to_string(),
                    value: self.auth.jwt_previous_key_id.clone(),
                });
            }
        }

        let lifetimes = [
            ("JWT_ACCESS_TTL_SECS", self.auth.access_ttl_secs),
            ("JWT_REFRESH_TTL_SECS", self.auth.refresh_ttl_secs),
        ];
        for (key, secs) in lifetimes {
            if secs == 0 || secs > MAX_TTL_SECS {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: format!("{secs} (expected 1..={MAX_TTL_SECS})"),
                });
            }
        }
        if self.auth.leeway_secs > MAX_TTL_SECS {
            return Err(ConfigError::InvalidValue {
                key: "JWT_LEEWAY_SECS".to_string(),
                value: format!("{} (expected at most {MAX_TTL_SECS})", self.auth.leeway_secs),
            });
        }

        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env("API_PORT")? {
            self.server.port = port;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // PostgreSQL
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.postgres_url = Some(url);
        }
        if let Some(size) = parse_env("DATABASE_POOL_SIZE")? {
            self.database.pool_size = size;
        }

        // Secrets always come from the environment when present
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = Some(SecretString::from(secret));
        }
        if let Ok(kid) = std::env::var("JWT_KEY_ID") {
            self.auth.jwt_key_id = kid;
        }
        if let Ok(secret) = std::env::var("JWT_PREVIOUS_SECRET") {
            self.auth.jwt_previous_secret = Some(SecretString::from(secret));
        }
        if let Ok(kid) = std::env::var("JWT_PREVIOUS_KEY_ID") {
            self.auth.jwt_previous_key_id = kid;
        }
        if let Some(ttl) = parse_env("JWT_ACCESS_TTL_SECS")? {
            self.auth.access_ttl_secs = ttl;
        }
        if let Some(ttl) = parse_env("JWT_REFRESH_TTL_SECS")? {
            self.auth.refresh_ttl_secs = ttl;
        }
        if let Some(leeway) = parse_env("JWT_LEEWAY_SECS")? {
            self.auth.leeway_secs = leeway;
        }
        if let Ok(email) = std::env::var("ADMIN_EMAIL") {
            self.auth.bootstrap_admin_email = Some(email);
        }
        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            self.auth.bootstrap_admin_password = Some(SecretString::from(password));
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = parse_env("LOG_JSON")? {
            self.logging.json_format = json;
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS (empty disables cross-origin access)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec![],
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; the in-memory store is used when unset
    pub postgres_url: Option<String>,

    /// PostgreSQL connection pool size
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: None,
            pool_size: 10,
        }
    }
}

/// Token and session configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing and verifying tokens
    #[serde(skip_serializing)]
    pub jwt_secret: Option<SecretString>,

    /// Key identifier written into the token header
    pub jwt_key_id: String,

    /// Retired secret still accepted for verification during a rotation
    #[serde(skip_serializing)]
    pub jwt_previous_secret: Option<SecretString>,

    /// Key identifier of the retired secret
    pub jwt_previous_key_id: String,

    /// Access token lifetime in seconds (default: 900 = 15 minutes, at most `MAX_TTL_SECS`)
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds (default: 604800 = 7 days)
    pub refresh_ttl_secs: u64,

    /// Accepted clock skew when checking expiry
    pub leeway_secs: u64,

    /// Admin account created at startup when no admin exists
    pub bootstrap_admin_email: Option<String>,

    #[serde(skip_serializing)]
    pub bootstrap_admin_password: Option<SecretString>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_key_id: "primary".to_string(),
            jwt_previous_secret: None,
            jwt_previous_key_id: "previous".to_string(),
            access_ttl_secs: 15 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
            leeway_secs: 0,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<SecretString>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &redact(&self.jwt_secret))
            .field("jwt_key_id", &self.jwt_key_id)
            .field("jwt_previous_secret", &redact(&self.jwt_previous_secret))
            .field("jwt_previous_key_id", &self.jwt_previous_key_id)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("leeway_secs", &self.leeway_secs)
            .field("bootstrap_admin_email", &self.bootstrap_admin_email)
            .field(
                "bootstrap_admin_password",
                &redact(&self.bootstrap_admin_password),
            )
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secret(secret: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some(SecretString::from(secret));
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.access_ttl_secs, 900);
        assert_eq!(config.auth.refresh_ttl_secs, 604_800);
        assert_eq!(config.auth.leeway_secs, 0);
        assert!(config.database.postgres_url.is_none());
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let result = AppConfig::default().validate();
        assert!(matches!(result, Err(ConfigError::MissingRequired(key)) if key == "JWT_SECRET"));
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let result = with_secret("too-short").validate();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_valid_secret_passes() {
        let config = with_secret("0123456789abcdef0123456789abcdef");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_previous_key_must_have_distinct_id() {
        let mut config = with_secret("0123456789abcdef0123456789abcdef");
        config.auth.jwt_previous_secret = Some("fedcba9876543210fedcba9876543210".into());
        config.auth.jwt_previous_key_id = config.auth.jwt_key_id.clone();
        assert!(config.validate().is_err());

        config.auth.jwt_previous_key_id = "2024-q1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let mut config = with_secret("0123456789abcdef0123456789abcdef");
        config.auth.access_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_ttl_is_rejected() {
        let mut config = with_secret("0123456789abcdef0123456789abcdef");
        config.auth.access_ttl_secs = 100_000_000_000_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "JWT_ACCESS_TTL_SECS"
        ));

        let mut config = with_secret("0123456789abcdef0123456789abcdef");
        config.auth.refresh_ttl_secs = MAX_TTL_SECS + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "JWT_REFRESH_TTL_SECS"
        ));

        config.auth.refresh_ttl_secs = MAX_TTL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_oversized_leeway_is_rejected() {
        let mut config = with_secret("0123456789abcdef0123456789abcdef");
        config.auth.leeway_secs = u64::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "JWT_LEEWAY_SECS"
        ));
    }

    #[test]
    fn test_secret_deserializes_from_toml() {
        let content = r#"
            [auth]
            jwt_secret = "0123456789abcdef0123456789abcdef"
        "#;
        let config: AppConfig = toml::from_str(content).unwrap();
        let secret = config.auth.jwt_secret.as_ref().map(|s| s.expose_secret());
        assert_eq!(secret, Some("0123456789abcdef0123456789abcdef"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = with_secret("0123456789abcdef0123456789abcdef");
        config.auth.bootstrap_admin_password = Some("hunter2hunter2".into());
        let rendered = format!("{:?}", config.auth);
        assert!(!rendered.contains("0123456789abcdef"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_parse_toml() {
        let content = r#"
            [server]
            port = 9090

            [auth]
            jwt_key_id = "2025-01"
            access_ttl_secs = 600
        "#;
        let config: AppConfig = toml::from_str(content).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.jwt_key_id, "2025-01");
        assert_eq!(config.auth.access_ttl_secs, 600);
        assert_eq!(config.auth.refresh_ttl_secs, 604_800);
    }
}
