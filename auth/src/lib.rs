//! Token-based authentication core
//!
//! Provides the pieces a service needs to authenticate users statelessly:
//! - Credential verification against a pluggable user store (Argon2id hashes)
//! - Access/refresh token pairs signed with a rotating HMAC key ring
//! - Refresh token rotation with revocation of the consumed token
//! - Fixed-window rate limiting of login attempts
//!
//! Transport layers talk to [`AuthServicePort`]; storage and hashing are
//! injected through the [`UserStore`] and [`PasswordHasher`] ports.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use token_auth::AuthService;
//! use token_auth::AuthServicePort;
//! use token_auth::Argon2PasswordHasher;
//! use token_auth::Credential;
//! use token_auth::InMemoryUserStore;
//! use token_auth::KeyRing;
//! use token_auth::SystemClock;
//! use token_auth::TokenCodec;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let hasher = Argon2PasswordHasher::new();
//! let store = InMemoryUserStore::new();
//! store
//!     .insert(Credential::new("u-1", "alice", hasher.hash("password123").unwrap()))
//!     .await;
//!
//! let codec = TokenCodec::new(KeyRing::single("k1", b"secret_key_at_least_32_bytes_long!").unwrap());
//! let service = AuthService::new(Arc::new(store), Arc::new(hasher), codec, Arc::new(SystemClock));
//!
//! let pair = service.login("alice", "password123").await.unwrap();
//! let claims = service.validate(&pair.access_token).await.unwrap();
//! assert_eq!(claims.subject, "u-1");
//!
//! let rotated = service.refresh(&pair.refresh_token).await.unwrap();
//! service.logout(&rotated.refresh_token).await.unwrap();
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod errors;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod revocation;
pub mod service;
pub mod store;

// Re-export commonly used items
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use errors::AuthError;
pub use jwt::ClaimSet;
pub use jwt::JwtError;
pub use jwt::KeyRing;
pub use jwt::SigningKey;
pub use jwt::TokenCodec;
pub use jwt::TokenPair;
pub use jwt::TokenType;
pub use password::Argon2PasswordHasher;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use rate_limit::RateLimitConfig;
pub use rate_limit::RateLimiter;
pub use revocation::Revocation;
pub use revocation::RevocationRegistry;
pub use service::AuthService;
pub use service::AuthServicePort;
pub use service::TokenPolicy;
pub use store::Credential;
pub use store::InMemoryUserStore;
pub use store::StoreError;
pub use store::UserStore;
