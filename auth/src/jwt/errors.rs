use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

/// Error type for token encoding, decoding and key management.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Token signature does not match")]
    SignatureMismatch,

    #[error("Token signed with unknown key: {0}")]
    UnknownKey(String),

    #[error("No signing key is active at {0}")]
    NoActiveKey(i64),

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            // A foreign algorithm in the header counts as a bad tag
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                JwtError::SignatureMismatch
            }
            _ => JwtError::Malformed(err.to_string()),
        }
    }
}
