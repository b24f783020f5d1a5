use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

use crate::jwt::JwtError;
use crate::jwt::TokenType;
use crate::password::PasswordError;
use crate::store::StoreError;

/// Top-level error for every authentication operation.
///
/// Each variant maps to one HTTP status via [`AuthError::status_code`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown identity or wrong secret; deliberately indistinguishable
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many attempts, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token signature mismatch")]
    SignatureMismatch,

    #[error("Token expired")]
    Expired,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Wrong token type: expected {expected}, got {actual}")]
    WrongTokenType {
        expected: TokenType,
        actual: TokenType,
    },

    // Infrastructure errors
    #[error("Upstream call timed out")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status a transport layer should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::Malformed(_)
            | AuthError::SignatureMismatch
            | AuthError::Expired
            | AuthError::TokenRevoked => StatusCode::UNAUTHORIZED,
            AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::WrongTokenType { .. } => StatusCode::FORBIDDEN,
            AuthError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Delay to advertise in a `Retry-After` header, when one applies.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AuthError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Malformed(reason) => AuthError::Malformed(reason),
            // Never guess a key: a token naming one we don't hold is unverifiable
            JwtError::SignatureMismatch | JwtError::UnknownKey(_) => AuthError::SignatureMismatch,
            other @ (JwtError::EncodingFailed(_)
            | JwtError::NoActiveKey(_)
            | JwtError::InvalidKey(_)) => AuthError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
