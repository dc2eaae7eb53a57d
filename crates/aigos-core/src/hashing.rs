// crates/aigos-core/src/hashing.rs
// ============================================================================
// Module: AIGOS Canonical Hashing
// Description: RFC 8785 JSON canonicalization and SHA-256 digest helpers.
// Purpose: Provide deterministic, prefixed digests for golden threads and capabilities.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Governance digests are rendered as `sha256:<lowercase hex>`. Structured
//! values are canonicalized with RFC 8785 (JCS) before hashing so two
//! semantically equal manifests always produce the same digest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix carried by every governance digest string.
pub const SHA256_PREFIX: &str = "sha256:";

/// Number of hex characters in a SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical hashes.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes raw bytes and returns the prefixed digest string.
#[must_use]
pub fn sha256_prefixed(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    format!("{SHA256_PREFIX}{}", hex_encode(&digest))
}

/// Hashes canonical JSON and returns the prefixed digest string.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(sha256_prefixed(&bytes))
}

/// Returns true when the value is a well-formed prefixed SHA-256 digest.
#[must_use]
pub fn is_sha256_digest(value: &str) -> bool {
    value.strip_prefix(SHA256_PREFIX).is_some_and(|hex| {
        hex.len() == SHA256_HEX_LEN
            && hex.bytes().all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte))
    })
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[usize::from(byte >> 4)] as char);
        out.push(HEX[usize::from(byte & 0x0f)] as char);
    }
    out
}
