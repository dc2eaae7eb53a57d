// crates/aigos-core/src/token/validator.rs
// ============================================================================
// Module: AIGOS Token Validator
// Description: Verifies governance tokens against trusted keys and control policy.
// Purpose: Authenticate counterparties and surface their claims to policy engines.
// Dependencies: ed25519-dalek, serde_json, crate::{identity, time}
// ============================================================================

//! ## Overview
//! [`TokenValidator::validate`] runs a fixed sequence of checks and stops at
//! the first failure with exactly one [`TokenErrorCode`]:
//! 1. Token shape, header type, key lookup, and signature.
//! 2. Issuer and audience.
//! 3. Expiry and not-before within the clock tolerance.
//! 4. Structural claim validation.
//! 5. Risk ceiling.
//! 6. Kill switch requirement.
//! 7. Paused flag.
//! 8. Termination pending flag.
//!
//! Multiple keys may be trusted at once to support key rotation.
//!
//! Security posture: the payload is not inspected until the signature has
//! been verified against a trusted key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use super::TokenError;
use super::claims::Audience;
use super::claims::CLAIMS_NAMESPACE;
use super::claims::GovernanceTokenPayload;
use super::codec::GOVERNANCE_TOKEN_TYPE;
use super::codec::TOKEN_ALGORITHM;
use super::codec::decode_header;
use super::codec::decode_payload;
use super::codec::split_token;
use super::codec::verify_signature;
use super::validation::validate_claims;
use crate::identity::RiskLevel;
use crate::time::Clock;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default clock tolerance in seconds.
pub const DEFAULT_CLOCK_TOLERANCE_SECONDS: i64 = 30;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// Token validation failure codes.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenErrorCode {
    /// Token could not be split or decoded.
    MalformedToken,
    /// Header type marker is not the governance token type.
    InvalidTokenType,
    /// No trusted key matches the header key identifier.
    KeyNotFound,
    /// Signature does not verify.
    InvalidSignature,
    /// Issuer does not match.
    InvalidIssuer,
    /// Audience does not match.
    InvalidAudience,
    /// Token is past its expiry.
    Expired,
    /// Token is not yet valid.
    NotYetValid,
    /// Claim block is structurally invalid.
    MissingClaims,
    /// Counterpart risk level exceeds the ceiling.
    RiskTooHigh,
    /// Counterpart kill switch is not armed.
    KillSwitchDisabled,
    /// Counterpart is paused.
    AgentPaused,
    /// Counterpart has a pending termination.
    TerminationPending,
}

impl TokenErrorCode {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedToken => "MALFORMED_TOKEN",
            Self::InvalidTokenType => "INVALID_TOKEN_TYPE",
            Self::KeyNotFound => "KEY_NOT_FOUND",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidIssuer => "INVALID_ISSUER",
            Self::InvalidAudience => "INVALID_AUDIENCE",
            Self::Expired => "EXPIRED",
            Self::NotYetValid => "NOT_YET_VALID",
            Self::MissingClaims => "MISSING_CLAIMS",
            Self::RiskTooHigh => "RISK_TOO_HIGH",
            Self::KillSwitchDisabled => "KILL_SWITCH_DISABLED",
            Self::AgentPaused => "AGENT_PAUSED",
            Self::TerminationPending => "TERMINATION_PENDING",
        }
    }

    /// Returns the transport status a handshake adapter should answer with.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::RiskTooHigh
            | Self::KillSwitchDisabled
            | Self::AgentPaused
            | Self::TerminationPending => 403,
            Self::MalformedToken
            | Self::InvalidTokenType
            | Self::KeyNotFound
            | Self::InvalidSignature
            | Self::InvalidIssuer
            | Self::InvalidAudience
            | Self::Expired
            | Self::NotYetValid
            | Self::MissingClaims => 401,
        }
    }
}

impl fmt::Display for TokenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Validation failure detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidationError {
    /// Failure code.
    pub code: TokenErrorCode,
    /// Human-readable detail.
    pub message: String,
}

/// Token validation result.
///
/// # Invariants
/// - `payload` is `Some` exactly when `valid` is true.
/// - `error` is `Some` exactly when `valid` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenValidation {
    /// Whether the token was accepted.
    pub valid: bool,
    /// Decoded payload for accepted tokens.
    pub payload: Option<GovernanceTokenPayload>,
    /// Failure detail for rejected tokens.
    pub error: Option<TokenValidationError>,
}

impl TokenValidation {
    /// Builds a rejection.
    fn reject(code: TokenErrorCode, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            payload: None,
            error: Some(TokenValidationError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Builds an acceptance.
    const fn accept(payload: GovernanceTokenPayload) -> Self {
        Self {
            valid: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// Returns the failure code, if any.
    #[must_use]
    pub fn code(&self) -> Option<TokenErrorCode> {
        self.error.as_ref().map(|error| error.code)
    }
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Validator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Required issuer (`None` accepts any).
    pub expected_issuer: Option<String>,
    /// Required audience (`None` accepts any).
    pub expected_audience: Option<String>,
    /// Clock tolerance for expiry and not-before.
    pub clock_tolerance_seconds: i64,
    /// Risk ceiling (`None` disables the check).
    pub max_risk_level: Option<RiskLevel>,
    /// Require an armed kill switch.
    pub require_kill_switch: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            expected_issuer: None,
            expected_audience: None,
            clock_tolerance_seconds: DEFAULT_CLOCK_TOLERANCE_SECONDS,
            max_risk_level: None,
            require_kill_switch: false,
        }
    }
}

/// Per-call overrides of the validator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Issuer override.
    pub expected_issuer: Option<String>,
    /// Audience override.
    pub expected_audience: Option<String>,
    /// Clock tolerance override.
    pub clock_tolerance_seconds: Option<i64>,
    /// Risk ceiling override.
    pub max_risk_level: Option<RiskLevel>,
    /// Kill switch requirement override.
    pub require_kill_switch: Option<bool>,
}

/// Registered claims read before the namespaced block is decoded.
#[derive(Deserialize)]
struct RegisteredClaims {
    /// Issuer.
    iss: Option<String>,
    /// Audience.
    aud: Option<Audience>,
    /// Expiry.
    exp: Option<i64>,
    /// Not-before.
    nbf: Option<i64>,
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Governance token validator.
pub struct TokenValidator {
    /// Validator configuration.
    config: ValidatorConfig,
    /// Trusted verifying keys by key identifier.
    keys: BTreeMap<String, VerifyingKey>,
    /// Time source for temporal checks.
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    /// Creates a validator trusting the provided keys.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::NoTrustedKeys`] when `keys` is empty.
    pub fn new(
        config: ValidatorConfig,
        keys: impl IntoIterator<Item = (String, VerifyingKey)>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        let keys: BTreeMap<String, VerifyingKey> = keys.into_iter().collect();
        if keys.is_empty() {
            return Err(TokenError::NoTrustedKeys);
        }
        Ok(Self {
            config,
            keys,
            clock,
        })
    }

    /// Returns the validator configuration.
    #[must_use]
    pub const fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Trusts an additional key, replacing any key with the same identifier.
    pub fn add_trusted_key(&mut self, key_id: impl Into<String>, key: VerifyingKey) {
        self.keys.insert(key_id.into(), key);
    }

    /// Stops trusting a key. Returns true when the key was present.
    pub fn remove_trusted_key(&mut self, key_id: &str) -> bool {
        self.keys.remove(key_id).is_some()
    }

    /// Returns the trusted key identifiers in sorted order.
    #[must_use]
    pub fn trusted_key_ids(&self) -> Vec<String> {
        self.keys.keys().cloned().collect()
    }

    /// Validates a compact governance token.
    #[must_use]
    pub fn validate(&self, token: &str, options: &ValidateOptions) -> TokenValidation {
        let Some(parts) = split_token(token) else {
            return TokenValidation::reject(
                TokenErrorCode::MalformedToken,
                "token must have three non-empty segments",
            );
        };
        let Some(header) = decode_header(parts.header) else {
            return TokenValidation::reject(
                TokenErrorCode::MalformedToken,
                "token header is not valid base64url JSON",
            );
        };
        if header.typ != GOVERNANCE_TOKEN_TYPE {
            return TokenValidation::reject(
                TokenErrorCode::InvalidTokenType,
                format!("unexpected token type: {}", header.typ),
            );
        }
        let Some(key) = self.keys.get(&header.kid) else {
            return TokenValidation::reject(
                TokenErrorCode::KeyNotFound,
                format!("no trusted key for kid {}", header.kid),
            );
        };
        if header.alg != TOKEN_ALGORITHM || !verify_signature(&parts, key) {
            return TokenValidation::reject(
                TokenErrorCode::InvalidSignature,
                "signature verification failed",
            );
        }
        let Some(payload) = decode_payload(parts.payload) else {
            return TokenValidation::reject(
                TokenErrorCode::MalformedToken,
                "token payload is not valid base64url JSON",
            );
        };
        let Ok(registered) = RegisteredClaims::deserialize(&payload) else {
            return TokenValidation::reject(
                TokenErrorCode::MalformedToken,
                "registered claims have unexpected types",
            );
        };

        if let Some(failure) = self.check_registered(&registered, options) {
            return failure;
        }

        let namespaced = payload.get(CLAIMS_NAMESPACE).unwrap_or(&Value::Null);
        let structural = validate_claims(namespaced);
        if !structural.valid {
            return TokenValidation::reject(
                TokenErrorCode::MissingClaims,
                structural.errors.join("; "),
            );
        }
        let typed = match GovernanceTokenPayload::deserialize(&payload) {
            Ok(typed) => typed,
            Err(err) => {
                return TokenValidation::reject(TokenErrorCode::MissingClaims, err.to_string());
            }
        };

        if let Some(failure) = self.check_control(&typed, options) {
            return failure;
        }
        TokenValidation::accept(typed)
    }

    /// Checks issuer, audience, and the temporal window.
    fn check_registered(
        &self,
        registered: &RegisteredClaims,
        options: &ValidateOptions,
    ) -> Option<TokenValidation> {
        let expected_issuer =
            options.expected_issuer.as_ref().or(self.config.expected_issuer.as_ref());
        if let Some(expected) = expected_issuer
            && registered.iss.as_ref() != Some(expected)
        {
            return Some(TokenValidation::reject(
                TokenErrorCode::InvalidIssuer,
                format!("issuer does not match {expected}"),
            ));
        }
        let expected_audience =
            options.expected_audience.as_ref().or(self.config.expected_audience.as_ref());
        if let Some(expected) = expected_audience
            && !registered.aud.as_ref().is_some_and(|aud| aud.contains(expected))
        {
            return Some(TokenValidation::reject(
                TokenErrorCode::InvalidAudience,
                format!("audience does not include {expected}"),
            ));
        }

        let tolerance =
            options.clock_tolerance_seconds.unwrap_or(self.config.clock_tolerance_seconds);
        let now = self.clock.now_unix_seconds();
        let Some(exp) = registered.exp else {
            return Some(TokenValidation::reject(TokenErrorCode::MissingClaims, "exp: missing"));
        };
        if now > exp.saturating_add(tolerance) {
            return Some(TokenValidation::reject(
                TokenErrorCode::Expired,
                format!("token expired at {exp}"),
            ));
        }
        if let Some(nbf) = registered.nbf
            && nbf > now.saturating_add(tolerance)
        {
            return Some(TokenValidation::reject(
                TokenErrorCode::NotYetValid,
                format!("token not valid before {nbf}"),
            ));
        }
        None
    }

    /// Checks risk ceiling and control-state flags.
    fn check_control(
        &self,
        payload: &GovernanceTokenPayload,
        options: &ValidateOptions,
    ) -> Option<TokenValidation> {
        let claims = &payload.claims;
        let ceiling = options.max_risk_level.or(self.config.max_risk_level);
        let risk = claims.governance.risk_level;
        if let Some(ceiling) = ceiling
            && risk.exceeds(ceiling)
        {
            return Some(TokenValidation::reject(
                TokenErrorCode::RiskTooHigh,
                format!("risk level {risk} exceeds maximum {ceiling}"),
            ));
        }
        let require_kill_switch =
            options.require_kill_switch.unwrap_or(self.config.require_kill_switch);
        if require_kill_switch && !claims.control.kill_switch.enabled {
            return Some(TokenValidation::reject(
                TokenErrorCode::KillSwitchDisabled,
                "kill switch is not enabled",
            ));
        }
        if claims.control.paused {
            return Some(TokenValidation::reject(TokenErrorCode::AgentPaused, "agent is paused"));
        }
        if claims.control.termination_pending {
            return Some(TokenValidation::reject(
                TokenErrorCode::TerminationPending,
                "agent termination is pending",
            ));
        }
        None
    }
}
