pub mod argon2;
pub mod errors;

use async_trait::async_trait;

pub use self::argon2::Argon2PasswordHasher;
pub use errors::PasswordError;

/// Verification of plaintext secrets against stored hashes.
///
/// The hashing algorithm lives behind this port; the core only ever asks
/// whether a secret matches.
#[async_trait]
pub trait PasswordHasher: Send + Sync + 'static {
    /// Check a plaintext password against a stored hash.
    ///
    /// # Arguments
    /// * `password` - Plaintext password presented at login
    /// * `hash` - Stored hash bytes, as returned by the user store
    ///
    /// # Returns
    /// True if the password matches, false otherwise
    ///
    /// # Errors
    /// * `VerificationFailed` - Hash is unreadable or verification could not run
    async fn verify(&self, password: &str, hash: &[u8]) -> Result<bool, PasswordError>;
}
