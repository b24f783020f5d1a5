use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::ClaimSet;
use super::errors::JwtError;
use super::keys::KeyRing;
use super::keys::SigningKey;

/// Token codec for encoding and decoding signed claim sets.
///
/// Tokens are compact JWTs signed with HS256. The signing key is chosen from
/// a [`KeyRing`] and named in the `kid` header; decoding looks the key up by
/// that id and never falls back to another key.
///
/// Expiry is not checked here. Callers compare `expires_at` against their own
/// clock so that time stays injectable.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    keys: KeyRing,
    algorithm: Algorithm,
}

impl TokenCodec {
    /// Create a codec over a key ring.
    ///
    /// # Security Notes
    /// - Secrets should come from environment variables or a vault, never code
    /// - Rotate by adding a key with a later `valid_from`; keep the old key in
    ///   the ring until every token it signed has expired
    pub fn new(keys: KeyRing) -> Self {
        Self {
            keys,
            algorithm: Algorithm::HS256,
        }
    }

    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Encode claims with the key active at their issuance time.
    ///
    /// # Errors
    /// * `NoActiveKey` - No key in the ring is valid at `claims.issued_at`
    /// * `EncodingFailed` - Serialization or signing failed
    pub fn issue(&self, claims: &ClaimSet) -> Result<String, JwtError> {
        let key = self
            .keys
            .active_at(claims.issued_at)
            .ok_or(JwtError::NoActiveKey(claims.issued_at))?;

        self.issue_with(claims, key)
    }

    /// Encode claims with an explicit key.
    ///
    /// # Returns
    /// `base64url(header).base64url(payload).base64url(signature)`
    ///
    /// # Errors
    /// * `EncodingFailed` - Serialization or signing failed
    pub fn issue_with(&self, claims: &ClaimSet, key: &SigningKey) -> Result<String, JwtError> {
        let mut header = Header::new(self.algorithm);
        header.kid = Some(key.key_id().to_string());

        encode(&header, claims, key.encoding_key())
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Verify a token's signature and decode its claims.
    ///
    /// # Errors
    /// * `Malformed` - Wrong structure, bad base64 or JSON, or no `kid` header
    /// * `UnknownKey` - `kid` names a key that is not in the ring
    /// * `SignatureMismatch` - Tag does not verify or algorithm differs
    pub fn decode(&self, token: &str) -> Result<ClaimSet, JwtError> {
        let header = decode_header(token)?;

        let key_id = header
            .kid
            .ok_or_else(|| JwtError::Malformed("token header missing 'kid'".to_string()))?;

        let key = self
            .keys
            .get(&key_id)
            .ok_or_else(|| JwtError::UnknownKey(key_id.clone()))?;

        let token_data = decode::<ClaimSet>(token, key.decoding_key(), &self.validation())?;

        Ok(token_data.claims)
    }

    /// Decode claims without verifying the signature.
    ///
    /// # Security Warning
    /// This does NOT validate the token signature. Only use for logging or
    /// diagnostics; never trust these claims for authorization decisions.
    pub fn decode_unverified(&self, token: &str) -> Result<ClaimSet, JwtError> {
        let mut validation = self.validation();
        validation.insecure_disable_signature_validation();

        let token_data = decode::<ClaimSet>(token, &DecodingKey::from_secret(&[]), &validation)?;

        Ok(token_data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is the caller's decision, made against an injected clock
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    use super::*;
    use crate::jwt::claims::TokenType;

    const SECRET_1: &[u8] = b"secret1_at_least_32_bytes_long_key!";
    const SECRET_2: &[u8] = b"secret2_at_least_32_bytes_long_key!";

    fn codec() -> TokenCodec {
        TokenCodec::new(KeyRing::single("k1", SECRET_1).unwrap())
    }

    fn claims() -> ClaimSet {
        ClaimSet::new("user123", TokenType::Access, 1_700_000_000, 900).with_scope(["read"])
    }

    #[test]
    fn test_issue_and_decode() {
        let codec = codec();
        let claims = claims();

        let token = codec.issue(&claims).expect("Failed to issue token");
        assert_eq!(token.split('.').count(), 3);

        let decoded = codec.decode(&token).expect("Failed to decode token");
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_issue_is_deterministic() {
        let codec = codec();
        let claims = claims();

        let first = codec.issue(&claims).unwrap();
        let second = codec.issue(&claims).unwrap();
        assert_eq!(first, second);

        // Decoding and re-encoding yields the identical string
        let decoded = codec.decode(&first).unwrap();
        assert_eq!(codec.issue(&decoded).unwrap(), first);
    }

    #[test]
    fn test_wire_segments() {
        let codec = codec();
        let claims = claims();
        let token = codec.issue(&claims).unwrap();

        let segments: Vec<&str> = token.split('.').collect();
        let header = URL_SAFE_NO_PAD.decode(segments[0]).unwrap();
        let payload = URL_SAFE_NO_PAD.decode(segments[1]).unwrap();

        assert_eq!(header, br#"{"typ":"JWT","alg":"HS256","kid":"k1"}"#);
        assert_eq!(payload, serde_json::to_vec(&claims).unwrap());
    }

    #[test]
    fn test_decode_garbage_is_malformed() {
        let codec = codec();

        for token in ["", "not-a-token", "a.b", "invalid.token.here", "a.b.c.d"] {
            let result = codec.decode(token);
            assert!(
                matches!(result, Err(JwtError::Malformed(_))),
                "expected Malformed for {:?}, got {:?}",
                token,
                result
            );
        }
    }

    #[test]
    fn test_decode_without_kid_is_malformed() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT","alg":"HS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims()).unwrap());
        let token = format!("{}.{}.c2lnbmF0dXJl", header, payload);

        let result = codec().decode(&token);
        assert!(matches!(result, Err(JwtError::Malformed(_))));
    }

    #[test]
    fn test_decode_with_wrong_secret() {
        let signer = codec();
        let verifier = TokenCodec::new(KeyRing::single("k1", SECRET_2).unwrap());

        let token = signer.issue(&claims()).unwrap();

        let result = verifier.decode(&token);
        assert_eq!(result, Err(JwtError::SignatureMismatch));
    }

    #[test]
    fn test_decode_unknown_key_id() {
        let signer = codec();
        let verifier = TokenCodec::new(KeyRing::single("k2", SECRET_1).unwrap());

        let token = signer.issue(&claims()).unwrap();

        let result = verifier.decode(&token);
        assert_eq!(result, Err(JwtError::UnknownKey("k1".to_string())));
    }

    #[test]
    fn test_flipped_payload_bit_is_signature_mismatch() {
        let codec = codec();
        let token = codec.issue(&claims()).unwrap();

        let segments: Vec<&str> = token.split('.').collect();
        let payload = URL_SAFE_NO_PAD.decode(segments[1]).unwrap();

        for byte in 0..payload.len() {
            for bit in 0..8 {
                let mut flipped = payload.clone();
                flipped[byte] ^= 1 << bit;

                let tampered = format!(
                    "{}.{}.{}",
                    segments[0],
                    URL_SAFE_NO_PAD.encode(&flipped),
                    segments[2]
                );

                assert_eq!(
                    codec.decode(&tampered),
                    Err(JwtError::SignatureMismatch),
                    "byte {} bit {}",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_algorithm_swap_is_signature_mismatch() {
        let codec = codec();
        let token = codec.issue(&claims()).unwrap();
        let (_, rest) = token.split_once('.').unwrap();

        let header = URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT","alg":"HS512","kid":"k1"}"#);
        let forged = format!("{}.{}", header, rest);

        assert_eq!(codec.decode(&forged), Err(JwtError::SignatureMismatch));
    }

    #[test]
    fn test_retired_key_still_decodes() {
        let old_codec = TokenCodec::new(KeyRing::single("2024", SECRET_1).unwrap());
        let claims = claims();
        let token = old_codec.issue(&claims).unwrap();

        let rotated = TokenCodec::new(
            KeyRing::new([
                SigningKey::new("2024", SECRET_1, 0).unwrap(),
                SigningKey::new("2025", SECRET_2, 1_000).unwrap(),
            ])
            .unwrap(),
        );

        // New tokens go out under the newer key
        let fresh = rotated.issue(&claims).unwrap();
        assert_eq!(decode_header(&fresh).unwrap().kid.as_deref(), Some("2025"));

        // Old tokens keep validating against the retired key
        assert_eq!(rotated.decode(&token).unwrap(), claims);
    }

    #[test]
    fn test_issue_without_active_key() {
        let codec = TokenCodec::new(
            KeyRing::new([SigningKey::new("future", SECRET_1, 2_000_000_000).unwrap()]).unwrap(),
        );

        let result = codec.issue(&claims());
        assert_eq!(result, Err(JwtError::NoActiveKey(1_700_000_000)));
    }

    #[test]
    fn test_decode_unverified() {
        let signer = codec();
        let other = TokenCodec::new(KeyRing::single("k9", SECRET_2).unwrap());

        let claims = claims();
        let token = signer.issue(&claims).unwrap();

        // Decode without verification should work even with a foreign key ring
        let decoded = other.decode_unverified(&token).unwrap();
        assert_eq!(decoded.subject, "user123");
        assert_eq!(decoded.token_id, claims.token_id);
    }
}
