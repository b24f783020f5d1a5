use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Slot a token is allowed to occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => f.write_str("access"),
            TokenType::Refresh => f.write_str("refresh"),
        }
    }
}

/// Signed payload carried inside every token.
///
/// Field order here is the order on the wire, and `scope` is kept sorted,
/// so encoding the same claims with the same key always produces the same
/// token string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Subject (user identifier)
    #[serde(rename = "sub")]
    pub subject: String,

    /// Unique per issuance; the unit of revocation
    #[serde(rename = "jti")]
    pub token_id: Uuid,

    /// Issued at (Unix timestamp)
    #[serde(rename = "iat")]
    pub issued_at: i64,

    /// Expiration time (Unix timestamp)
    #[serde(rename = "exp")]
    pub expires_at: i64,

    #[serde(rename = "typ")]
    pub token_type: TokenType,

    #[serde(default)]
    pub scope: BTreeSet<String>,
}

impl ClaimSet {
    /// Create claims with a freshly generated token identifier.
    ///
    /// # Arguments
    /// * `subject` - User identifier the token is bound to
    /// * `token_type` - Access or refresh slot
    /// * `issued_at` - Issuance time (Unix timestamp)
    /// * `ttl_secs` - Lifetime in seconds
    pub fn new(
        subject: impl ToString,
        token_type: TokenType,
        issued_at: i64,
        ttl_secs: i64,
    ) -> Self {
        Self {
            subject: subject.to_string(),
            token_id: Uuid::new_v4(),
            issued_at,
            expires_at: issued_at.saturating_add(ttl_secs),
            token_type,
            scope: BTreeSet::new(),
        }
    }

    /// Replace the scope set.
    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    /// Check if the token is expired.
    ///
    /// A token stops being valid at the exact second it expires.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        current_timestamp >= self.expires_at
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.contains(scope)
    }
}

/// Access and refresh tokens issued together.
///
/// Only ever constructed once both tokens have been encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: i64,
    pub refresh_expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_claims() {
        let claims = ClaimSet::new("user123", TokenType::Access, 1_000, 900);

        assert_eq!(claims.subject, "user123");
        assert_eq!(claims.issued_at, 1_000);
        assert_eq!(claims.expires_at, 1_900);
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.scope.is_empty());
    }

    #[test]
    fn test_token_ids_are_unique() {
        let a = ClaimSet::new("user123", TokenType::Refresh, 0, 60);
        let b = ClaimSet::new("user123", TokenType::Refresh, 0, 60);
        assert_ne!(a.token_id, b.token_id);
    }

    #[test]
    fn test_is_expired() {
        let claims = ClaimSet::new("user123", TokenType::Access, 0, 1_000);

        assert!(!claims.is_expired(999));
        assert!(claims.is_expired(1_000)); // Exactly at expiration
        assert!(claims.is_expired(1_001));
    }

    #[test]
    fn test_scope_is_sorted_on_the_wire() {
        let claims = ClaimSet::new("user123", TokenType::Access, 0, 60)
            .with_scope(["write", "admin", "read"]);

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["scope"], serde_json::json!(["admin", "read", "write"]));
        assert!(claims.has_scope("read"));
        assert!(!claims.has_scope("delete"));
    }

    #[test]
    fn test_wire_field_order() {
        let claims = ClaimSet::new("u1", TokenType::Refresh, 10, 20);
        let json = serde_json::to_string(&claims).unwrap();

        let expected = format!(
            r#"{{"sub":"u1","jti":"{}","iat":10,"exp":30,"typ":"refresh","scope":[]}}"#,
            claims.token_id
        );
        assert_eq!(json, expected);
    }

    #[test]
    fn test_missing_scope_defaults_to_empty() {
        let json = r#"{"sub":"u1","jti":"67e55044-10b1-426f-9247-bb680e5fe0c8","iat":1,"exp":2,"typ":"access"}"#;
        let claims: ClaimSet = serde_json::from_str(json).unwrap();
        assert!(claims.scope.is_empty());
        assert_eq!(claims.token_type, TokenType::Access);
    }
}
