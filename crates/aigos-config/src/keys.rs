// crates/aigos-config/src/keys.rs
// ============================================================================
// Module: Key Material
// Description: Trusted public keys and the token signing key.
// Purpose: Load inline or file-backed key material with hard size limits.
// Dependencies: aigos-kill-switch, base64, ed25519-dalek, serde
// ============================================================================

//! ## Overview
//! Keys are given inline (base64 or PEM) or as a file path, never both.
//! Key files are read with a size cap and must be UTF-8.
//! Security posture: key files are untrusted input until decoded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use aigos_kill_switch::SignatureAlgorithm;
use aigos_kill_switch::TrustedKey;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::SigningKey;
use ed25519_dalek::pkcs8::DecodePrivateKey;
use serde::Deserialize;

use crate::config::ConfigError;
use crate::config::validate_identifier;
use crate::config::validate_path_string;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum key file size in bytes.
pub(crate) const MAX_KEY_FILE_SIZE: usize = 64 * 1024;
/// Prefix that marks PEM-encoded material.
const PEM_PREFIX: &str = "-----BEGIN";

// ============================================================================
// SECTION: Trusted Keys
// ============================================================================

/// A trusted public key entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustedKeyConfig {
    /// Key identifier matched against signature key ids.
    pub key_id: String,
    /// Signature algorithm label (`Ed25519`, `RSA-SHA256`, `ECDSA-P256`).
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Inline public key (base64 or PEM SPKI).
    #[serde(default)]
    pub public_key: Option<String>,
    /// Path to a file holding the public key.
    #[serde(default)]
    pub public_key_path: Option<PathBuf>,
}

impl TrustedKeyConfig {
    /// Validates the entry without touching the filesystem.
    pub(crate) fn validate(&self, field: &str) -> Result<(), ConfigError> {
        validate_identifier(&format!("{field}.key_id"), &self.key_id)?;
        SignatureAlgorithm::from_str(&self.algorithm)
            .map_err(|err| ConfigError::Invalid(format!("{field}.{}: {err}", self.key_id)))?;
        match (&self.public_key, &self.public_key_path) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(format!(
                "{field}.{}: public_key and public_key_path are mutually exclusive",
                self.key_id
            ))),
            (None, None) => Err(ConfigError::Invalid(format!(
                "{field}.{}: public_key or public_key_path is required",
                self.key_id
            ))),
            (Some(key), None) if key.trim().is_empty() => Err(ConfigError::Invalid(format!(
                "{field}.{}: public_key must be non-empty",
                self.key_id
            ))),
            (None, Some(path)) => validate_path_string(
                &format!("{field}.{}.public_key_path", self.key_id),
                &path.to_string_lossy(),
            ),
            (Some(_), None) => Ok(()),
        }
    }

    /// Reads and decodes the key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the key file cannot be read or the
    /// material does not decode for the declared algorithm.
    pub fn load(&self, field: &str) -> Result<TrustedKey, ConfigError> {
        let label = format!("{field}.{}", self.key_id);
        let material = read_key_material(
            &label,
            self.public_key.as_deref(),
            self.public_key_path.as_deref(),
        )?;
        TrustedKey::decode(self.key_id.trim(), &self.algorithm, &material)
            .map_err(|err| ConfigError::Invalid(format!("{label}: {err}")))
    }
}

/// Default trusted key algorithm.
fn default_algorithm() -> String {
    SignatureAlgorithm::Ed25519.as_str().to_string()
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Returns inline material or reads it from `path`.
pub(crate) fn read_key_material(
    field: &str,
    inline: Option<&str>,
    path: Option<&Path>,
) -> Result<String, ConfigError> {
    if let Some(material) = inline {
        return Ok(material.trim().to_string());
    }
    let Some(path) = path else {
        return Err(ConfigError::Invalid(format!("{field} is not configured")));
    };
    let bytes = fs::read(path).map_err(|err| {
        ConfigError::Io(format!("{field}: {}: {err}", path.display()))
    })?;
    if bytes.len() > MAX_KEY_FILE_SIZE {
        return Err(ConfigError::Invalid(format!("{field} key file exceeds size limit")));
    }
    let text = String::from_utf8(bytes)
        .map_err(|_| ConfigError::Invalid(format!("{field} key file must be utf-8")))?;
    Ok(text.trim().to_string())
}

/// Decodes an Ed25519 signing key from a base64 seed or PKCS#8 PEM.
pub(crate) fn decode_signing_key(material: &str) -> Result<SigningKey, ConfigError> {
    let invalid = |detail: String| ConfigError::Invalid(format!("token.signing_key: {detail}"));
    if material.starts_with(PEM_PREFIX) {
        return SigningKey::from_pkcs8_pem(material).map_err(|err| invalid(err.to_string()));
    }
    let bytes = STANDARD.decode(material).map_err(|err| invalid(err.to_string()))?;
    let seed: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| invalid(format!("expected 32 bytes, got {}", bytes.len())))?;
    Ok(SigningKey::from_bytes(&seed))
}
