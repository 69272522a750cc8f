//! Cryptographic utilities for webhook verification.
//!
//! Creem signs webhook deliveries with HMAC-SHA256 over the raw request body
//! and sends the hex-encoded digest in the `creem-signature` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 over `message` and return the hex-encoded digest
/// (64 characters).
///
/// # Panics
///
/// This function will never panic in practice. The `expect` call is guarded
/// by the invariant that HMAC-SHA256 accepts keys of any size per RFC 2104.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    // INVARIANT: HMAC-SHA256 accepts keys of any size per RFC 2104, so
    // `new_from_slice` only fails if the Hmac implementation is broken.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(message.as_bytes());
    let result = mac.finalize();

    hex::encode(result.into_bytes())
}

/// Constant-time string comparison for signature verification.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Verify a hex HMAC-SHA256 signature over `body`.
#[must_use]
pub fn verify_signature(body: &str, signature: &str, secret: &str) -> bool {
    constant_time_eq(&hmac_sha256_hex(secret, body), signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_64_hex_chars() {
        let digest = hmac_sha256_hex("key", "some payload");
        assert_eq!(digest.len(), 64);
        assert!(digest.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(
            hmac_sha256_hex("secret", "message"),
            hmac_sha256_hex("secret", "message")
        );
    }

    #[test]
    fn different_secrets_differ() {
        assert_ne!(
            hmac_sha256_hex("secret-a", "message"),
            hmac_sha256_hex("secret-b", "message")
        );
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
    }

    #[test]
    fn verify_signature_roundtrip() {
        let body = r#"{"eventType":"checkout.completed"}"#;
        let signature = hmac_sha256_hex("whsec", body);

        assert!(verify_signature(body, &signature, "whsec"));
        assert!(!verify_signature(body, &signature, "other"));
        assert!(!verify_signature(body, "deadbeef", "whsec"));
    }
}
