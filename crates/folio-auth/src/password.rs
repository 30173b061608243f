//! Password hashing against the stored credential digest.

use sha2::{Digest, Sha256};

/// SHA-256 digest of a password.
pub fn hash_password(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

/// Hex form of [`hash_password`], the format used in configuration.
pub fn hash_password_hex(password: &str) -> String {
    hex::encode(hash_password(password))
}

/// Compares the password digest with `expected` without short-circuiting.
pub fn verify_password(password: &str, expected: &[u8; 32]) -> bool {
    let actual = hash_password(password);
    actual
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUHLO: &str = "3ee0ef67e5441065fe9c8996436ba7b1e4a7c589662b35f07a41d435d3aae2cb";

    #[test]
    fn test_known_digest() {
        assert_eq!(hash_password_hex("huhlo"), HUHLO);
    }

    #[test]
    fn test_verify() {
        let mut expected = [0u8; 32];
        hex::decode_to_slice(HUHLO, &mut expected).unwrap();

        assert!(verify_password("huhlo", &expected));
        assert!(!verify_password("wrong", &expected));
        assert!(!verify_password("Huhlo", &expected));
        assert!(!verify_password("", &expected));
    }
}
