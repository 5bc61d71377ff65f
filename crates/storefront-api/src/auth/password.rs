//! Password hashing and verification using Argon2id
//!
//! Implements salted, memory-hard password hashing:
//! - Algorithm: Argon2id
//! - Memory: 64 MB
//! - Iterations: 3
//! - Parallelism: 4 threads
//! - Salt: 16 bytes random, embedded in the PHC string
//! - Output: 32 bytes hash

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;
/// Maximum accepted password length
pub const MAX_PASSWORD_LEN: usize = 128;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Password hashing configuration
///
/// Increasing memory or iterations improves resistance to offline attacks
/// but slows down every registration and login.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (threads, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Cheap parameters for tests
    pub fn lightweight() -> Self {
        Self {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// One-way password hashing with constant-time verification
///
/// Holds no state besides its parameters and a lazily computed decoy
/// digest, so clones are cheap and can be moved onto blocking threads.
#[derive(Debug, Clone, Default)]
pub struct CredentialVerifier {
    config: PasswordConfig,
    decoy: Arc<OnceLock<String>>,
}

impl CredentialVerifier {
    pub fn new(config: PasswordConfig) -> Self {
        Self {
            config,
            decoy: Arc::new(OnceLock::new()),
        }
    }

    /// Hash a plaintext password; repeated calls yield different digests
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        hash_password_with_config(password, &self.config)
    }

    /// Verify a plaintext password against a stored digest
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        verify_password(password, hash)
    }

    /// Verify against a digest that may not exist
    ///
    /// When `hash` is `None` the password is checked against a decoy digest
    /// with the same parameters and `false` is returned, so an unknown
    /// account costs as much time as a wrong password.
    pub fn verify_or_decoy(&self, password: &str, hash: Option<&str>) -> Result<bool, PasswordError> {
        match hash {
            Some(hash) => self.verify(password, hash),
            None => {
                let decoy = match self.decoy.get() {
                    Some(decoy) => decoy,
                    None => {
                        let computed = self.hash("decoy-password-never-matches")?;
                        self.decoy.get_or_init(|| computed)
                    }
                };
                self.verify(password, decoy)?;
                Ok(false)
            }
        }
    }
}

/// Hash a plaintext password using Argon2id with default parameters
///
/// Returns a PHC string (algorithm, parameters, salt and hash), safe to
/// store as-is.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with_config(password, &PasswordConfig::default())
}

/// Hash a password with custom configuration
pub fn hash_password_with_config(
    password: &str,
    config: &PasswordConfig,
) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = config.to_params()?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// * `Ok(true)` - Password matches
/// * `Ok(false)` - Password does not match
/// * `Err(PasswordError)` - The stored hash is unusable
///
/// Parameters are read from the PHC string, so digests created with any
/// `PasswordConfig` verify here.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Validate password length
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters long"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(PasswordConfig::lightweight())
    }

    #[test]
    fn test_hash_and_verify_password() {
        let verifier = verifier();
        let hash = verifier.hash("password123").expect("Failed to hash password");

        assert!(verifier.verify("password123", &hash).unwrap());
        assert!(!verifier.verify("password124", &hash).unwrap());
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let verifier = verifier();

        let hash1 = verifier.hash("SamePassword123").unwrap();
        let hash2 = verifier.hash("SamePassword123").unwrap();
        assert_ne!(hash1, hash2);

        assert!(verifier.verify("SamePassword123", &hash1).unwrap());
        assert!(verifier.verify("SamePassword123", &hash2).unwrap());
    }

    #[test]
    fn test_default_parameters_are_embedded() {
        let hash = hash_password("password123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=65536"));
        assert!(hash.contains("t=3"));
        assert!(hash.contains("p=4"));
        assert!(verify_password("password123", &hash).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", "invalid-hash-format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_decoy_never_matches() {
        let verifier = verifier();
        assert!(!verifier
            .verify_or_decoy("decoy-password-never-matches", None)
            .unwrap());
        // Second call reuses the cached decoy
        assert!(!verifier.verify_or_decoy("anything", None).unwrap());

        let hash = verifier.hash("password123").unwrap();
        assert!(verifier.verify_or_decoy("password123", Some(&hash)).unwrap());
    }

    #[test]
    fn test_password_length_validation() {
        assert!(validate_password_strength("password123").is_ok());
        assert!(validate_password_strength("12345678").is_ok());

        assert!(validate_password_strength("short").is_err());
        assert!(validate_password_strength(&"x".repeat(MAX_PASSWORD_LEN + 1)).is_err());
    }
}
