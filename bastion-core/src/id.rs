//! ID generation utilities with prefix support
//!
//! IDs look like `acc_3fRk0x...`: a short type prefix, an underscore and at
//! least 96 bits of URL-safe base64 randomness.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};

use crate::crypto::random_bytes;

/// Generate a prefixed ID with 96 bits of entropy
///
/// ```rust,ignore
/// let account_id = generate_prefixed_id("acc");
/// assert!(account_id.starts_with("acc_"));
/// ```
pub fn generate_prefixed_id(prefix: &str) -> String {
    let bytes = random_bytes::<12>();
    let encoded = BASE64_URL_SAFE_NO_PAD.encode(bytes);
    format!("{prefix}_{encoded}")
}

/// Validate that a prefixed ID has the expected format
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    let Some(random_part) = id
        .strip_prefix(expected_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= 12,
        Err(_) => false,
    }
}
