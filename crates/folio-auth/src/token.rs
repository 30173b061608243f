//! Self-describing session tokens.
//!
//! A token carries everything needed to validate it, so there is no session
//! store. The cookie value is
//!
//! ```text
//! base64url(json({nonce, epoch, issued_at})) "." base64url(hmac_sha256(secret, payload))
//! ```
//!
//! Bumping the deployment epoch invalidates every outstanding token at once.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a presented token is not a valid session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("signature mismatch")]
    BadSignature,

    #[error("issued under epoch {token}, current epoch is {current}")]
    StaleEpoch { token: u64, current: u64 },

    #[error("session expired")]
    Expired,
}

/// Claims embedded in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// 32 random bytes, hex-encoded.
    pub nonce: String,
    /// Deployment epoch at issuance.
    pub epoch: u64,
    /// Unix seconds at issuance.
    pub issued_at: u64,
}

impl SessionToken {
    /// Creates a token with a fresh random nonce.
    pub fn issue(epoch: u64, issued_at: u64) -> Self {
        let mut nonce = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self { nonce: hex::encode(nonce), epoch, issued_at }
    }

    /// Serializes and signs the token into a cookie-safe string.
    pub fn encode(&self, secret: &[u8]) -> Result<String, TokenError> {
        let json = serde_json::to_vec(self).map_err(|e| TokenError::Malformed(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(sign(secret, payload.as_bytes()));
        Ok(format!("{payload}.{signature}"))
    }

    /// Verifies the signature and deserializes the claims.
    ///
    /// Does not check epoch or age, see [`SessionToken::ensure_current`].
    pub fn decode(value: &str, secret: &[u8]) -> Result<Self, TokenError> {
        let (payload, signature) = value
            .split_once('.')
            .ok_or_else(|| TokenError::Malformed("missing signature".into()))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;

        let mut mac = keyed_mac(secret);
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| TokenError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| TokenError::Malformed(e.to_string()))
    }

    /// Checks the epoch and age against the running deployment.
    ///
    /// A token is expired once `now - issued_at` reaches `ttl_secs`.
    pub fn ensure_current(&self, epoch: u64, now: u64, ttl_secs: u64) -> Result<(), TokenError> {
        if self.epoch != epoch {
            return Err(TokenError::StaleEpoch { token: self.epoch, current: epoch });
        }
        if now.saturating_sub(self.issued_at) >= ttl_secs {
            return Err(TokenError::Expired);
        }
        Ok(())
    }
}

// HMAC pads or hashes the key to the block size, so every key length is accepted.
fn keyed_mac(secret: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(secret).expect("HMAC-SHA256 accepts keys of any length")
}

fn sign(secret: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut mac = keyed_mac(secret);
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-test-secret";

    #[test]
    fn test_issue_nonce_is_random_hex() {
        let a = SessionToken::issue(1, 100);
        let b = SessionToken::issue(1, 100);
        assert_eq!(a.nonce.len(), 64);
        assert!(a.nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn test_encode_decode() {
        let token = SessionToken::issue(7, 1_700_000_000);
        let encoded = token.encode(SECRET).unwrap();

        assert!(!encoded.contains(';'));
        assert!(!encoded.contains('='));
        assert_eq!(SessionToken::decode(&encoded, SECRET).unwrap(), token);
    }

    #[test]
    fn test_any_secret_length_signs() {
        let token = SessionToken::issue(3, 100);
        for secret in [&b""[..], b"k", &[0xAB; 64], &[0x5A; 300]] {
            let encoded = token.encode(secret).unwrap();
            assert_eq!(SessionToken::decode(&encoded, secret).unwrap(), token);
        }
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let encoded = SessionToken::issue(7, 100).encode(SECRET).unwrap();
        let (_, signature) = encoded.split_once('.').unwrap();

        let forged = SessionToken { nonce: "00".repeat(32), epoch: 7, issued_at: u64::MAX };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());

        let result = SessionToken::decode(&format!("{forged_payload}.{signature}"), SECRET);
        assert_eq!(result, Err(TokenError::BadSignature));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let encoded = SessionToken::issue(7, 100).encode(SECRET).unwrap();
        let result = SessionToken::decode(&encoded, b"another-secret-entirely");
        assert_eq!(result, Err(TokenError::BadSignature));
    }

    #[test]
    fn test_garbage_is_malformed() {
        for value in ["", "abc", "abc.", "!!!.###", "a.b.c"] {
            let result = SessionToken::decode(value, SECRET);
            assert!(result.is_err(), "{value:?} should not decode");
        }
    }

    #[test]
    fn test_stale_epoch() {
        let token = SessionToken::issue(1, 100);
        assert_eq!(
            token.ensure_current(2, 100, 60),
            Err(TokenError::StaleEpoch { token: 1, current: 2 })
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let token = SessionToken::issue(1, 1000);
        assert_eq!(token.ensure_current(1, 1000, 60), Ok(()));
        assert_eq!(token.ensure_current(1, 1059, 60), Ok(()));
        assert_eq!(token.ensure_current(1, 1060, 60), Err(TokenError::Expired));
        assert_eq!(token.ensure_current(1, 5000, 60), Err(TokenError::Expired));
    }
}
