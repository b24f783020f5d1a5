use std::fmt;

/// Stored credential for one user.
///
/// `secret_hash` is opaque to the core and only ever handed to the password
/// hasher. The plaintext secret is never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Stable user identifier; becomes the token subject
    pub user_id: String,
    /// Login name
    pub identity: String,
    pub secret_hash: Vec<u8>,
}

impl Credential {
    pub fn new(
        user_id: impl ToString,
        identity: impl ToString,
        secret_hash: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            identity: identity.to_string(),
            secret_hash: secret_hash.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
