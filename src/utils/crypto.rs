// Cryptographic utilities: HMAC-SHA256 signing and key derivation

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Signing key size for HMAC-SHA256 (256 bits)
pub const SIGNING_KEY_SIZE: usize = 32;

/// Sign a message using HMAC-SHA256
///
/// # Returns
///
/// The HMAC-SHA256 signature as bytes (always 32 bytes)
///
/// # Errors
///
/// Returns an error if HMAC computation fails
pub fn hmac_sha256(message: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).context("Invalid HMAC key length")?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify an HMAC-SHA256 signature in constant time
#[must_use]
pub fn verify_hmac_sha256(message: &[u8], key: &[u8], signature: &[u8]) -> bool {
    let mut mac = match <HmacSha256 as Mac>::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(message);
    mac.verify_slice(signature).is_ok()
}

/// Lowercase hex digest of SHA-256 over the input
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex_encode(&digest)
}

/// Lowercase hex encoding
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        },
    )
}

/// Derive a proper 32-byte signing key from input key material
///
/// This function ensures that any input key is properly extended or truncated
/// to exactly 32 bytes. For keys shorter than 32 bytes, it uses a simple
/// hash-based extension method.
///
/// # Note
///
/// This is a simple key derivation method. For production use with weak keys,
/// consider using proper key derivation functions like PBKDF2 or HKDF.
#[must_use]
pub fn derive_signing_key(input_key: &[u8]) -> [u8; SIGNING_KEY_SIZE] {
    let mut signing_key = [0u8; SIGNING_KEY_SIZE];
    if input_key.is_empty() {
        return signing_key;
    }
    let key_len = std::cmp::min(input_key.len(), SIGNING_KEY_SIZE);
    signing_key[..key_len].copy_from_slice(&input_key[..key_len]);

    // If key is shorter than 32 bytes, derive the rest using a simple hash
    if key_len < SIGNING_KEY_SIZE {
        for i in key_len..SIGNING_KEY_SIZE {
            signing_key[i] =
                signing_key[i % key_len].wrapping_add(u8::try_from(i % 256).unwrap_or(0));
        }
    }

    signing_key
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &[u8] = b"test_secret_key_for_hmac_testing_32b";

    #[test]
    fn test_hmac_sha256_deterministic() {
        let message = b"test.message";

        let sig1 = hmac_sha256(message, TEST_SECRET).unwrap();
        let sig2 = hmac_sha256(message, TEST_SECRET).unwrap();

        assert_eq!(sig1, sig2, "HMAC signatures should be deterministic");
        assert_eq!(sig1.len(), 32); // SHA-256 produces 32-byte hash
    }

    #[test]
    fn test_hmac_sha256_different_messages() {
        let sig1 = hmac_sha256(b"test.message1", TEST_SECRET).unwrap();
        let sig2 = hmac_sha256(b"test.message2", TEST_SECRET).unwrap();

        assert_ne!(
            sig1, sig2,
            "Different messages should produce different signatures"
        );
    }

    #[test]
    fn test_verify_hmac_sha256() {
        let message = b"payload.to.sign";
        let signature = hmac_sha256(message, TEST_SECRET).unwrap();

        assert!(verify_hmac_sha256(message, TEST_SECRET, &signature));
        assert!(!verify_hmac_sha256(b"other.payload", TEST_SECRET, &signature));
        assert!(!verify_hmac_sha256(message, b"wrong-key", &signature));

        let mut tampered = signature.clone();
        tampered[0] ^= 0x01;
        assert!(!verify_hmac_sha256(message, TEST_SECRET, &tampered));
    }

    #[test]
    fn test_sha256_hex() {
        // SHA-256 of the empty string is a well-known value
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x00, 0xff, 0x10]), "00ff10");
        assert_eq!(hex_encode(&[]), "");
    }

    #[test]
    fn test_derive_signing_key_length() {
        let short = derive_signing_key(b"short");
        assert_eq!(short.len(), SIGNING_KEY_SIZE);

        let exact = derive_signing_key(&[0xaa; 32]);
        assert_eq!(&exact[..], &[0xaa; 32]);

        let long = derive_signing_key(&[0xbb; 64]);
        assert_eq!(&long[..], &[0xbb; 32]);
    }

    #[test]
    fn test_derive_signing_key_deterministic() {
        let key1 = derive_signing_key(b"some-session-secret");
        let key2 = derive_signing_key(b"some-session-secret");
        assert_eq!(key1, key2);

        let other = derive_signing_key(b"other-session-secret");
        assert_ne!(key1, other);
    }
}
