// crates/aigos-kill-switch/src/signature.rs
// ============================================================================
// Module: Kill Switch Signature Verifier
// Description: Detached signature verification over canonical command strings.
// Purpose: Authenticate operator commands before they can change agent state.
// Dependencies: base64, ed25519-dalek, p256, rsa, aigos-core
// ============================================================================

//! ## Overview
//! The canonical command string joins, with newlines and in this order:
//! `command_id`, type, timestamp, reason, `issued_by`, and the comma-joined
//! non-empty scope fields (`instance_id`, `asset_id`, `organization`).
//! Signatures travel as `ALGORITHM:base64(signature)[:key-id]`.
//! Invariants:
//! - Verification never fails with an error; every failure is a
//!   [`SignatureCheck`] with a distinct reason.
//! - Commands older than the age window or from the future are rejected.
//!
//! Security posture: command payloads come from the network or disk and are
//! untrusted until a trusted key verifies them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use aigos_core::Clock;
use aigos_core::time::parse_rfc3339_millis;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::pkcs8::DecodePublicKey;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::command::KillSwitchCommand;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum command age in seconds.
pub const DEFAULT_MAX_COMMAND_AGE_SECONDS: i64 = 300;

/// PEM armor prefix.
const PEM_PREFIX: &str = "-----BEGIN";

// ============================================================================
// SECTION: Algorithms
// ============================================================================

/// Supported command signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// Ed25519.
    #[serde(rename = "Ed25519")]
    Ed25519,
    /// RSA PKCS#1 v1.5 with SHA-256.
    #[serde(rename = "RSA-SHA256")]
    RsaSha256,
    /// ECDSA over P-256 with SHA-256.
    #[serde(rename = "ECDSA-P256")]
    EcdsaP256,
}

impl SignatureAlgorithm {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519",
            Self::RsaSha256 => "RSA-SHA256",
            Self::EcdsaP256 => "ECDSA-P256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = KeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        [Self::Ed25519, Self::RsaSha256, Self::EcdsaP256]
            .into_iter()
            .find(|algorithm| algorithm.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| KeyError::UnsupportedAlgorithm(value.to_string()))
    }
}

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Key material errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Algorithm label is not supported.
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// Key material could not be decoded.
    #[error("invalid {algorithm} key: {message}")]
    InvalidKey {
        /// Declared algorithm.
        algorithm: SignatureAlgorithm,
        /// Decoder detail.
        message: String,
    },
}

/// Decoded public key.
#[derive(Debug, Clone)]
pub enum PublicKey {
    /// Ed25519 verifying key.
    Ed25519(ed25519_dalek::VerifyingKey),
    /// P-256 verifying key.
    EcdsaP256(p256::ecdsa::VerifyingKey),
    /// RSA verifying key bound to SHA-256.
    RsaSha256(rsa::pkcs1v15::VerifyingKey<rsa::sha2::Sha256>),
}

impl PublicKey {
    /// Returns the key's algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Ed25519(_) => SignatureAlgorithm::Ed25519,
            Self::EcdsaP256(_) => SignatureAlgorithm::EcdsaP256,
            Self::RsaSha256(_) => SignatureAlgorithm::RsaSha256,
        }
    }

    /// Decodes key material for `algorithm`.
    ///
    /// Accepted encodings: PEM SPKI for every algorithm, raw 32-byte base64
    /// for Ed25519, SEC1 point base64 for P-256, and DER SPKI base64 for RSA.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidKey`] when the material does not decode.
    pub fn decode(algorithm: SignatureAlgorithm, material: &str) -> Result<Self, KeyError> {
        let invalid = |message: String| KeyError::InvalidKey {
            algorithm,
            message,
        };
        let material = material.trim();
        let is_pem = material.starts_with(PEM_PREFIX);
        match algorithm {
            SignatureAlgorithm::Ed25519 => {
                if is_pem {
                    let key = ed25519_dalek::VerifyingKey::from_public_key_pem(material)
                        .map_err(|err| invalid(err.to_string()))?;
                    return Ok(Self::Ed25519(key));
                }
                let bytes = STANDARD.decode(material).map_err(|err| invalid(err.to_string()))?;
                let raw: [u8; 32] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| invalid(format!("expected 32 bytes, got {}", bytes.len())))?;
                let key = ed25519_dalek::VerifyingKey::from_bytes(&raw)
                    .map_err(|err| invalid(err.to_string()))?;
                Ok(Self::Ed25519(key))
            }
            SignatureAlgorithm::EcdsaP256 => {
                if is_pem {
                    let public = p256::PublicKey::from_public_key_pem(material)
                        .map_err(|err| invalid(err.to_string()))?;
                    return Ok(Self::EcdsaP256(p256::ecdsa::VerifyingKey::from(&public)));
                }
                let bytes = STANDARD.decode(material).map_err(|err| invalid(err.to_string()))?;
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&bytes)
                    .map_err(|err| invalid(err.to_string()))?;
                Ok(Self::EcdsaP256(key))
            }
            SignatureAlgorithm::RsaSha256 => {
                let public = if is_pem {
                    rsa::RsaPublicKey::from_public_key_pem(material)
                        .map_err(|err| invalid(err.to_string()))?
                } else {
                    let bytes =
                        STANDARD.decode(material).map_err(|err| invalid(err.to_string()))?;
                    rsa::RsaPublicKey::from_public_key_der(&bytes)
                        .map_err(|err| invalid(err.to_string()))?
                };
                Ok(Self::RsaSha256(rsa::pkcs1v15::VerifyingKey::new(public)))
            }
        }
    }

    /// Verifies raw signature bytes over `message`.
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            Self::Ed25519(key) => ed25519_dalek::Signature::from_slice(signature)
                .is_ok_and(|signature| key.verify_strict(message, &signature).is_ok()),
            Self::EcdsaP256(key) => {
                let parsed = p256::ecdsa::Signature::from_der(signature)
                    .or_else(|_| p256::ecdsa::Signature::from_slice(signature));
                parsed.is_ok_and(|signature| {
                    p256::ecdsa::signature::Verifier::verify(key, message, &signature).is_ok()
                })
            }
            Self::RsaSha256(key) => rsa::pkcs1v15::Signature::try_from(signature).is_ok_and(
                |signature| rsa::signature::Verifier::verify(key, message, &signature).is_ok(),
            ),
        }
    }
}

/// Trusted operator key.
#[derive(Debug, Clone)]
pub struct TrustedKey {
    /// Key identifier referenced by signatures.
    pub key_id: String,
    /// Public key.
    pub key: PublicKey,
}

impl TrustedKey {
    /// Creates a trusted key.
    #[must_use]
    pub fn new(key_id: impl Into<String>, key: PublicKey) -> Self {
        Self {
            key_id: key_id.into(),
            key,
        }
    }

    /// Decodes key material into a trusted key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when the algorithm or material is invalid.
    pub fn decode(
        key_id: impl Into<String>,
        algorithm: &str,
        material: &str,
    ) -> Result<Self, KeyError> {
        let algorithm = SignatureAlgorithm::from_str(algorithm)?;
        Ok(Self::new(key_id, PublicKey::decode(algorithm, material)?))
    }
}

// ============================================================================
// SECTION: Canonical Form
// ============================================================================

/// Returns the canonical string a command signature covers.
#[must_use]
pub fn canonical_command_string(command: &KillSwitchCommand) -> String {
    let scope: Vec<&str> = [
        command.instance_id.as_deref(),
        command.asset_id.as_deref(),
        command.organization.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|value| !value.is_empty())
    .collect();
    let scope = scope.join(",");
    [
        command.command_id.as_str(),
        command.command_type.as_str(),
        command.timestamp.as_str(),
        command.reason.as_str(),
        command.issued_by.as_str(),
        scope.as_str(),
    ]
    .join("\n")
}

/// Parsed signature field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEnvelope {
    /// Declared algorithm.
    pub algorithm: SignatureAlgorithm,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
    /// Explicit key identifier.
    pub key_id: Option<String>,
}

impl SignatureEnvelope {
    /// Parses `ALGORITHM:base64[:key-id]`.
    fn parse(raw: &str) -> Result<Self, SignatureCheck> {
        let mut parts = raw.trim().splitn(3, ':');
        let algorithm = parts.next().unwrap_or_default();
        let Some(encoded) = parts.next().filter(|encoded| !encoded.is_empty()) else {
            return Err(SignatureCheck::fail(
                SignatureFailure::MalformedSignature,
                "signature must be ALGORITHM:base64[:key-id]",
            ));
        };
        let key_id = parts.next().map(str::trim).filter(|id| !id.is_empty()).map(str::to_string);
        let algorithm = SignatureAlgorithm::from_str(algorithm).map_err(|_| {
            SignatureCheck::fail(
                SignatureFailure::UnsupportedAlgorithm,
                format!("unsupported signature algorithm: {algorithm}"),
            )
        })?;
        let signature = STANDARD.decode(encoded).map_err(|err| {
            SignatureCheck::fail(
                SignatureFailure::MalformedSignature,
                format!("signature is not valid base64: {err}"),
            )
        })?;
        Ok(Self {
            algorithm,
            signature,
            key_id,
        })
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Signature failure kinds.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureFailure {
    /// Command carries no signature.
    MissingSignature,
    /// Signature field is not `ALGORITHM:base64[:key-id]`.
    MalformedSignature,
    /// Algorithm is not supported.
    UnsupportedAlgorithm,
    /// No trusted key matches.
    KeyNotFound,
    /// Command timestamp is unreadable.
    InvalidTimestamp,
    /// Command is older than the age window.
    CommandTooOld,
    /// Command timestamp is in the future.
    CommandInFuture,
    /// Signature does not verify.
    InvalidSignature,
}

/// Signature verification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCheck {
    /// Whether the command is authentic and fresh.
    pub valid: bool,
    /// Failure kind.
    pub failure: Option<SignatureFailure>,
    /// Human-readable failure reason.
    pub reason: Option<String>,
    /// Key that verified the command.
    pub key_id: Option<String>,
}

impl SignatureCheck {
    /// Builds a failure.
    fn fail(failure: SignatureFailure, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            failure: Some(failure),
            reason: Some(reason.into()),
            key_id: None,
        }
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Kill switch command signature verifier.
pub struct SignatureVerifier {
    /// Trusted keys in registration order.
    keys: Vec<TrustedKey>,
    /// Maximum command age in seconds.
    max_age_seconds: i64,
    /// Time source for age checks.
    clock: Arc<dyn Clock>,
}

impl SignatureVerifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new(keys: Vec<TrustedKey>, max_age_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            keys,
            max_age_seconds,
            clock,
        }
    }

    /// Returns true when no keys are trusted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns trusted key identifiers in registration order.
    #[must_use]
    pub fn key_ids(&self) -> Vec<String> {
        self.keys.iter().map(|key| key.key_id.clone()).collect()
    }

    /// Trusts a key, replacing any key with the same identifier.
    pub fn add_key(&mut self, key: TrustedKey) {
        self.keys.retain(|existing| existing.key_id != key.key_id);
        self.keys.push(key);
    }

    /// Stops trusting a key. Returns true when the key was present.
    pub fn remove_key(&mut self, key_id: &str) -> bool {
        let before = self.keys.len();
        self.keys.retain(|existing| existing.key_id != key_id);
        self.keys.len() != before
    }

    /// Verifies a command's signature and age.
    #[must_use]
    pub fn verify(&self, command: &KillSwitchCommand) -> SignatureCheck {
        if command.signature.trim().is_empty() {
            return SignatureCheck::fail(
                SignatureFailure::MissingSignature,
                "command is not signed",
            );
        }
        let envelope = match SignatureEnvelope::parse(&command.signature) {
            Ok(envelope) => envelope,
            Err(failure) => return failure,
        };
        if let Some(failure) = self.check_age(command) {
            return failure;
        }
        let Some(trusted) = self.find_key(&envelope) else {
            let reason = envelope.key_id.as_ref().map_or_else(
                || format!("no trusted {} key", envelope.algorithm),
                |key_id| format!("no trusted {} key with id {key_id}", envelope.algorithm),
            );
            return SignatureCheck::fail(SignatureFailure::KeyNotFound, reason);
        };
        let message = canonical_command_string(command);
        if !trusted.key.verify(message.as_bytes(), &envelope.signature) {
            return SignatureCheck::fail(
                SignatureFailure::InvalidSignature,
                format!("signature does not verify with key {}", trusted.key_id),
            );
        }
        SignatureCheck {
            valid: true,
            failure: None,
            reason: None,
            key_id: Some(trusted.key_id.clone()),
        }
    }

    /// Rejects unreadable, stale, and future timestamps.
    fn check_age(&self, command: &KillSwitchCommand) -> Option<SignatureCheck> {
        let Some(issued_at) = parse_rfc3339_millis(&command.timestamp) else {
            return Some(SignatureCheck::fail(
                SignatureFailure::InvalidTimestamp,
                format!("unreadable command timestamp: {}", command.timestamp),
            ));
        };
        let age_millis = self.clock.now_unix_millis().saturating_sub(issued_at);
        if age_millis < 0 {
            return Some(SignatureCheck::fail(
                SignatureFailure::CommandInFuture,
                "command timestamp is in the future",
            ));
        }
        if age_millis > self.max_age_seconds.saturating_mul(1000) {
            return Some(SignatureCheck::fail(
                SignatureFailure::CommandTooOld,
                format!(
                    "command is {}s old, exceeding the {}s window",
                    age_millis / 1000,
                    self.max_age_seconds
                ),
            ));
        }
        None
    }

    /// Finds the key by explicit id, else the first key for the algorithm.
    fn find_key(&self, envelope: &SignatureEnvelope) -> Option<&TrustedKey> {
        self.keys.iter().find(|trusted| {
            trusted.key.algorithm() == envelope.algorithm
                && envelope.key_id.as_ref().is_none_or(|key_id| &trusted.key_id == key_id)
        })
    }
}
