use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher as _;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Argon2;
use async_trait::async_trait;

use super::errors::PasswordError;
use super::PasswordHasher;

/// Argon2id password hasher.
///
/// Hashes are PHC strings (algorithm, parameters, salt and hash in one
/// value); the user store keeps them as raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2PasswordHasher;

impl Argon2PasswordHasher {
    /// Create a new password hasher instance.
    ///
    /// # Returns
    /// Argon2PasswordHasher configured with secure defaults
    pub fn new() -> Self {
        Self
    }

    /// Hash a plaintext password securely.
    ///
    /// Uses Argon2id with random salt generation.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to hash
    ///
    /// # Returns
    /// PHC string format hash
    ///
    /// # Errors
    /// * `HashingFailed` - Password hashing operation failed
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Verify a password against a stored hash on the current thread.
    ///
    /// # Errors
    /// * `VerificationFailed` - Hash is not UTF-8 or not a valid PHC string
    pub fn verify_blocking(&self, password: &str, hash: &[u8]) -> Result<bool, PasswordError> {
        let hash = std::str::from_utf8(hash).map_err(|e| {
            PasswordError::VerificationFailed(format!("Password hash is not UTF-8: {}", e))
        })?;

        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            PasswordError::VerificationFailed(format!("Invalid password hash: {}", e))
        })?;

        let argon2 = Argon2::default();

        Ok(argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    async fn verify(&self, password: &str, hash: &[u8]) -> Result<bool, PasswordError> {
        // Argon2 is deliberately slow; keep it off the async workers
        let hasher = *self;
        let password = password.to_owned();
        let hash = hash.to_vec();

        tokio::task::spawn_blocking(move || hasher.verify_blocking(&password, &hash))
            .await
            .map_err(|e| {
                PasswordError::VerificationFailed(format!("Verification task failed: {}", e))
            })?
    }
}
