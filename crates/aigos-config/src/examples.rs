// crates/aigos-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `aigos.toml`. The output is static and must always pass
//! [`crate::GovernanceConfig::from_toml_str`].

/// Returns a canonical example `aigos.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[token]
issuer = "aigos-control-plane"
audience = ["aigos-agents"]
key_id = "gov-2026"
ttl_seconds = 300
clock_tolerance_seconds = 30
# signing_key_path = "/etc/aigos/token-signing.pem"

[[trusted_keys]]
key_id = "gov-2026"
algorithm = "Ed25519"
public_key = "11qYAYKxCrfVS/7TyWQHOg7hcvPapiMlrwIaaPcHURo="

[validation]
max_risk_level = "high"
require_kill_switch = true

[golden_thread]
grace_period_days = 365
allow_expired = false

[policy.inbound]
blocked_instances = ["agent-quarantined"]
max_risk_level = "high"
require_kill_switch = true
require_golden_thread = true

[policy.outbound]
allowed_domains = ["api.example.com", "*.internal.example.com"]
blocked_domains = ["*.pastebin.com"]

[kill_switch]
enabled = true
channel = "polling"
endpoint = "https://control.example.com/v1/commands"
poll_interval_ms = 5000
max_reconnect_attempts = 10
reconnect_base_delay_ms = 1000
command_timeout_ms = 60000
max_command_age_seconds = 300
nonce_cache_size = 100
allow_resume = true
require_signature = true
instance_id = "agent-1"
organization = "example"

[[kill_switch.trusted_keys]]
key_id = "ops-2026"
algorithm = "Ed25519"
public_key = "11qYAYKxCrfVS/7TyWQHOg7hcvPapiMlrwIaaPcHURo="
"#,
    )
}
