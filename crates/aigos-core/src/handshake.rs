// crates/aigos-core/src/handshake.rs
// ============================================================================
// Module: AIGOS A2A Handshake
// Description: Header names and protocol version for governance token exchange.
// Purpose: Give request and response adapters one shared wire vocabulary.
// Dependencies: crate::token
// ============================================================================

//! ## Overview
//! Governance tokens travel in application headers on both the request and
//! the mirrored response. Adapters map [`TokenErrorCode::http_status`] onto
//! their transport when a token is rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::token::TokenErrorCode;
use crate::token::TokenValidation;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the governance token.
pub const TOKEN_HEADER: &str = "x-aigos-token";

/// Header carrying the handshake protocol version.
pub const PROTOCOL_VERSION_HEADER: &str = "x-aigos-protocol-version";

/// Current handshake protocol version.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when a peer's protocol version header is compatible.
///
/// A missing header is treated as the current version.
#[must_use]
pub fn is_supported_version(header_value: Option<&str>) -> bool {
    header_value.is_none_or(|value| value.trim() == PROTOCOL_VERSION)
}

/// Returns the transport status for a validation result (200 when accepted).
#[must_use]
pub fn response_status(validation: &TokenValidation) -> u16 {
    validation.code().map_or(200, TokenErrorCode::http_status)
}
