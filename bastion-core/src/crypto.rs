//! Cryptographic utilities
//!
//! Two concerns live here:
//!
//! 1. The credential hashing primitive, abstracted as [`CredentialHasher`] so
//!    the account guard never depends on a specific algorithm. [`Argon2Hasher`]
//!    is the default and produces PHC-format Argon2id strings.
//! 2. Secure random tokens (session tokens) which are stored as SHA256 hashes
//!    and compared in constant time via the `subtle` crate.
//!
//! High-entropy tokens do not need a slow KDF; Argon2 is reserved for the
//! low-entropy secrets people type.

use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{Error, error::CryptoError};

/// One-way derivation and verification of account secrets.
pub trait CredentialHasher: Send + Sync + 'static {
    /// Derive the digest stored in place of `raw`.
    fn hash(&self, raw: &str) -> Result<String, Error>;

    /// Check `raw` against a digest produced by [`CredentialHasher::hash`].
    ///
    /// A mismatch is `Ok(false)`; `Err` is reserved for unusable digests.
    fn verify(&self, raw: &str, digest: &str) -> Result<bool, Error>;
}

/// Argon2id hashing with a random salt per digest.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, raw: &str) -> Result<String, Error> {
        Ok(password_auth::generate_hash(raw))
    }

    fn verify(&self, raw: &str, digest: &str) -> Result<bool, Error> {
        match password_auth::verify_password(raw, digest) {
            Ok(()) => Ok(true),
            Err(password_auth::VerifyError::PasswordInvalid) => Ok(false),
            Err(e) => Err(Error::Crypto(CryptoError::PasswordHash(e.to_string()))),
        }
    }
}

/// Fill a fixed-size buffer from the OS random number generator.
///
/// # Panics
///
/// Panics if the OS random number generator fails. This indicates a critical
/// system failure from which recovery is not possible for security-sensitive
/// operations.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");
    bytes
}

/// Generate a 256-bit random token encoded as URL-safe base64 (43 characters).
pub fn generate_secure_token() -> String {
    let bytes = random_bytes::<32>();
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Hash a token for storage. Hex-encoded SHA256.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a token against a stored hash with constant-time comparison.
pub fn verify_token_hash(token: &str, stored_hash: &str) -> bool {
    let computed_hash = hash_token(token);
    constant_time_compare(computed_hash.as_bytes(), stored_hash.as_bytes())
}

pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_hash_and_verify() {
        let hasher = Argon2Hasher;
        let digest = hasher.hash("s3cr3t!").unwrap();

        assert_ne!(digest, "s3cr3t!");
        assert!(digest.starts_with("$argon2"));
        assert!(hasher.verify("s3cr3t!", &digest).unwrap());
        assert!(!hasher.verify("wrong", &digest).unwrap());
    }

    #[test]
    fn test_argon2_salts_each_digest() {
        let hasher = Argon2Hasher;
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_argon2_rejects_malformed_digest() {
        let result = Argon2Hasher.verify("anything", "not-a-phc-string");
        assert!(matches!(
            result,
            Err(Error::Crypto(CryptoError::PasswordHash(_)))
        ));
    }

    #[test]
    fn test_hash_and_verify_token() {
        let token = generate_secure_token();
        let hash = hash_token(&token);

        assert_eq!(token.len(), 43);
        assert_eq!(hash.len(), 64);
        assert!(verify_token_hash(&token, &hash));
        assert!(!verify_token_hash("wrong_token", &hash));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"hello", b"hello"));
        assert!(!constant_time_compare(b"hello", b"world"));
        assert!(!constant_time_compare(b"short", b"longer_string"));
    }
}
