// crates/aigos-core/src/token/mod.rs
// ============================================================================
// Module: AIGOS Governance Token
// Description: Signed governance token claims, generator, and validator.
// Purpose: Provide mutual A2A authentication with embedded control state.
// Dependencies: base64, ed25519-dalek, serde_json, uuid
// ============================================================================

//! ## Overview
//! A governance token is a compact, detached-signature bearer token
//! (`header.payload.signature`, base64url without padding) signed with
//! Ed25519. The header carries the governance token type marker and the
//! signing key identifier; the payload carries standard bearer claims plus
//! the namespaced `aigos` claim block.
//! Invariants:
//! - Tokens are immutable once signed.
//! - Validation short-circuits with exactly one [`TokenErrorCode`].
//!
//! Security posture: every token is untrusted input until the validator
//! accepts it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod claims;
pub mod codec;
pub mod generator;
pub mod validation;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use claims::Audience;
pub use claims::CapabilityClaims;
pub use claims::ControlClaims;
pub use claims::GoldenThreadClaims;
pub use claims::GovernanceClaims;
pub use claims::GovernanceStatusClaims;
pub use claims::GovernanceTokenPayload;
pub use claims::IdentityClaims;
pub use claims::KillSwitchClaims;
pub use claims::LineageClaims;
pub use codec::GOVERNANCE_TOKEN_TYPE;
pub use codec::TOKEN_ALGORITHM;
pub use codec::TokenHeader;
pub use generator::ControlState;
pub use generator::GeneratedToken;
pub use generator::GeneratorConfig;
pub use generator::TokenGenerator;
pub use generator::TokenInput;
pub use generator::TokenOptions;
pub use validation::ClaimValidation;
pub use validation::SubsetCheck;
pub use validation::is_capability_subset;
pub use validator::TokenErrorCode;
pub use validator::TokenValidation;
pub use validator::TokenValidationError;
pub use validator::TokenValidator;
pub use validator::ValidateOptions;
pub use validator::ValidatorConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

use thiserror::Error;

/// Programmer and configuration errors for the token subsystem.
///
/// # Invariants
/// - Expected validation failures are never reported through this type.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Claims could not be serialized.
    #[error("token serialization failed: {0}")]
    Serialization(String),
    /// Validator was constructed without any trusted keys.
    #[error("token validator requires at least one trusted key")]
    NoTrustedKeys,
    /// Key material could not be decoded.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
