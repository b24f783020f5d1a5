use std::collections::HashSet;
use std::fmt;

use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;

use super::errors::JwtError;

/// Versioned HMAC signing key.
///
/// The `key_id` travels in the token header so that a decoder can pick the
/// exact key a token was signed with, even after newer keys take over.
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    valid_from: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Minimum secret length for HS256 (256 bits).
    pub const MIN_SECRET_LENGTH: usize = 32;

    /// Create a signing key.
    ///
    /// # Arguments
    /// * `key_id` - Identifier embedded in the `kid` header
    /// * `secret` - HMAC secret, at least 32 bytes
    /// * `valid_from` - First instant (Unix timestamp) the key may sign tokens
    ///
    /// # Errors
    /// * `InvalidKey` - Empty key id or secret shorter than 32 bytes
    pub fn new(key_id: impl ToString, secret: &[u8], valid_from: i64) -> Result<Self, JwtError> {
        let key_id = key_id.to_string();

        if key_id.is_empty() {
            return Err(JwtError::InvalidKey("key id must not be empty".to_string()));
        }

        if secret.len() < Self::MIN_SECRET_LENGTH {
            return Err(JwtError::InvalidKey(format!(
                "secret for key '{}' is {} bytes, minimum is {}",
                key_id,
                secret.len(),
                Self::MIN_SECRET_LENGTH
            )));
        }

        Ok(Self {
            key_id,
            valid_from,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn valid_from(&self) -> i64 {
        self.valid_from
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("valid_from", &self.valid_from)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of signing keys, oldest first.
#[derive(Debug, Clone)]
pub struct KeyRing {
    keys: Vec<SigningKey>,
}

impl KeyRing {
    /// Build a key ring.
    ///
    /// # Errors
    /// * `InvalidKey` - No keys given, or two keys share an id
    pub fn new(keys: impl IntoIterator<Item = SigningKey>) -> Result<Self, JwtError> {
        let mut keys: Vec<SigningKey> = keys.into_iter().collect();

        if keys.is_empty() {
            return Err(JwtError::InvalidKey(
                "key ring needs at least one key".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for key in &keys {
            if !seen.insert(key.key_id.as_str()) {
                return Err(JwtError::InvalidKey(format!(
                    "duplicate key id '{}'",
                    key.key_id
                )));
            }
        }

        // Stable sort keeps configuration order for keys sharing a start time.
        keys.sort_by_key(|key| key.valid_from);

        Ok(Self { keys })
    }

    /// Key ring holding one key valid since the epoch.
    pub fn single(key_id: impl ToString, secret: &[u8]) -> Result<Self, JwtError> {
        Self::new([SigningKey::new(key_id, secret, 0)?])
    }

    /// Newest key allowed to sign at `timestamp`.
    pub fn active_at(&self, timestamp: i64) -> Option<&SigningKey> {
        self.keys
            .iter()
            .rev()
            .find(|key| key.valid_from <= timestamp)
    }

    /// Key with the given id, whether or not it still signs new tokens.
    pub fn get(&self, key_id: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|key| key.key_id == key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET_A: &[u8] = b"secret_a_at_least_32_bytes_long_key!";
    const SECRET_B: &[u8] = b"secret_b_at_least_32_bytes_long_key!";

    #[test]
    fn test_short_secret_rejected() {
        let result = SigningKey::new("k1", b"too-short", 0);
        assert!(matches!(result, Err(JwtError::InvalidKey(_))));
    }

    #[test]
    fn test_empty_key_id_rejected() {
        let result = SigningKey::new("", SECRET_A, 0);
        assert!(matches!(result, Err(JwtError::InvalidKey(_))));
    }

    #[test]
    fn test_empty_ring_rejected() {
        let result = KeyRing::new(Vec::new());
        assert!(matches!(result, Err(JwtError::InvalidKey(_))));
    }

    #[test]
    fn test_duplicate_key_ids_rejected() {
        let result = KeyRing::new([
            SigningKey::new("k1", SECRET_A, 0).unwrap(),
            SigningKey::new("k1", SECRET_B, 100).unwrap(),
        ]);
        assert!(matches!(result, Err(JwtError::InvalidKey(_))));
    }

    #[test]
    fn test_active_key_follows_valid_from() {
        let ring = KeyRing::new([
            SigningKey::new("2025-02", SECRET_B, 2_000).unwrap(),
            SigningKey::new("2025-01", SECRET_A, 1_000).unwrap(),
        ])
        .unwrap();

        assert!(ring.active_at(999).is_none());
        assert_eq!(ring.active_at(1_000).unwrap().key_id(), "2025-01");
        assert_eq!(ring.active_at(1_999).unwrap().key_id(), "2025-01");
        assert_eq!(ring.active_at(2_000).unwrap().key_id(), "2025-02");
    }

    #[test]
    fn test_lookup_by_id_includes_retired_keys() {
        let ring = KeyRing::new([
            SigningKey::new("old", SECRET_A, 0).unwrap(),
            SigningKey::new("new", SECRET_B, 10).unwrap(),
        ])
        .unwrap();

        assert_eq!(ring.len(), 2);
        assert!(ring.get("old").is_some());
        assert!(ring.get("new").is_some());
        assert!(ring.get("missing").is_none());
    }

    #[test]
    fn test_debug_does_not_print_secret() {
        let key = SigningKey::new("k1", SECRET_A, 0).unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains("k1"));
        assert!(!debug.contains("secret_a"));
    }
}
