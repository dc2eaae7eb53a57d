// crates/aigos-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for aigos-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use aigos_config::ConfigError;
use aigos_config::GovernanceConfig;
use aigos_config::TrustedKeyConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::SigningKey;

pub type TestResult = Result<(), String>;

/// Seed of the token signing key used across tests.
pub const TOKEN_SEED: [u8; 32] = [7u8; 32];
/// Seed of the operator command key used across tests.
pub const OPERATOR_SEED: [u8; 32] = [11u8; 32];

/// Parses a TOML string into a `GovernanceConfig` without validating.
pub fn config_from_toml(toml_str: &str) -> Result<GovernanceConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<GovernanceConfig, toml::de::Error> {
    config_from_toml("")
}

/// Returns the base64 public key for a seed.
pub fn public_key_b64(seed: [u8; 32]) -> String {
    STANDARD.encode(SigningKey::from_bytes(&seed).verifying_key().to_bytes())
}

/// Returns an inline Ed25519 trusted key entry.
pub fn trusted_key(key_id: &str, seed: [u8; 32]) -> TrustedKeyConfig {
    TrustedKeyConfig {
        key_id: key_id.to_string(),
        algorithm: "Ed25519".to_string(),
        public_key: Some(public_key_b64(seed)),
        public_key_path: None,
    }
}

/// Returns a config with an enabled, signed file-channel kill switch.
pub fn kill_switch_config(endpoint: &str) -> Result<GovernanceConfig, toml::de::Error> {
    let mut config = minimal_config()?;
    config.kill_switch.enabled = true;
    config.kill_switch.channel = aigos_core::ControlChannel::File;
    config.kill_switch.endpoint = Some(endpoint.to_string());
    config.kill_switch.trusted_keys = vec![trusted_key("ops-2026", OPERATOR_SEED)];
    Ok(config)
}

/// Asserts that `result` failed with a message containing `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
