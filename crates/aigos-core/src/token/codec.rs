// crates/aigos-core/src/token/codec.rs
// ============================================================================
// Module: AIGOS Token Codec
// Description: Compact token encoding and Ed25519 signing.
// Purpose: Serialize, sign, split, and verify governance token segments.
// Dependencies: base64, ed25519-dalek, serde_json
// ============================================================================

//! ## Overview
//! Tokens are `base64url(header).base64url(payload).base64url(signature)`
//! with no padding. The signature covers the ASCII bytes of
//! `header.payload`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header `typ` marker for governance tokens.
pub const GOVERNANCE_TOKEN_TYPE: &str = "AIGOS-GOV+jwt";

/// Header `alg` value for Ed25519 signatures.
pub const TOKEN_ALGORITHM: &str = "EdDSA";

// ============================================================================
// SECTION: Header
// ============================================================================

/// Governance token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signature algorithm.
    pub alg: String,
    /// Token type marker.
    pub typ: String,
    /// Signing key identifier.
    pub kid: String,
}

impl TokenHeader {
    /// Builds the header for a governance token signed by `key_id`.
    #[must_use]
    pub fn governance(key_id: impl Into<String>) -> Self {
        Self {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: GOVERNANCE_TOKEN_TYPE.to_string(),
            kid: key_id.into(),
        }
    }
}

// ============================================================================
// SECTION: Encoding
// ============================================================================

/// Signs serialized header and payload bytes into a compact token.
pub(crate) fn encode_signed(header: &[u8], payload: &[u8], key: &SigningKey) -> String {
    let signing_input =
        format!("{}.{}", URL_SAFE_NO_PAD.encode(header), URL_SAFE_NO_PAD.encode(payload));
    let signature = key.sign(signing_input.as_bytes());
    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Token split into its three segments.
pub(crate) struct TokenParts<'a> {
    /// `header.payload` signing input.
    pub signing_input: &'a str,
    /// Encoded header segment.
    pub header: &'a str,
    /// Encoded payload segment.
    pub payload: &'a str,
    /// Encoded signature segment.
    pub signature: &'a str,
}

/// Splits a compact token into segments; `None` unless exactly three are present.
pub(crate) fn split_token(token: &str) -> Option<TokenParts<'_>> {
    let (signing_input, signature) = token.trim().rsplit_once('.')?;
    let (header, payload) = signing_input.split_once('.')?;
    if header.is_empty() || payload.is_empty() || signature.is_empty() || payload.contains('.') {
        return None;
    }
    Some(TokenParts {
        signing_input,
        header,
        payload,
        signature,
    })
}

/// Decodes the header segment.
pub(crate) fn decode_header(segment: &str) -> Option<TokenHeader> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Decodes the payload segment into untyped JSON.
pub(crate) fn decode_payload(segment: &str) -> Option<Value> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Verifies the signature segment over the signing input.
pub(crate) fn verify_signature(parts: &TokenParts<'_>, key: &VerifyingKey) -> bool {
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(parts.signature) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(bytes.as_slice()) else {
        return false;
    };
    key.verify_strict(parts.signing_input.as_bytes(), &signature).is_ok()
}
