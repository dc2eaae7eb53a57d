// crates/aigos-config/src/config.rs
// ============================================================================
// Module: AIGOS Configuration
// Description: Configuration loading, validation, and component builders.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: aigos-core, aigos-kill-switch, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed so a misconfigured agent
//! never starts with weaker checks than its operator asked for.
//! Invariants:
//! - Every timeout, interval, and cache bound is range checked.
//! - An enabled kill switch that requires signatures must trust at least one
//!   key.
//! - Key identifiers are unique within each key list.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aigos_core::ApprovalPolicy;
use aigos_core::Audience;
use aigos_core::Clock;
use aigos_core::ControlChannel;
use aigos_core::GeneratorConfig;
use aigos_core::GoldenThreadVerifier;
use aigos_core::InboundPolicyConfig;
use aigos_core::InboundPolicyEngine;
use aigos_core::OutboundPolicyConfig;
use aigos_core::OutboundPolicyEngine;
use aigos_core::RiskLevel;
use aigos_core::TokenGenerator;
use aigos_core::TokenValidator;
use aigos_core::ValidatorConfig;
use aigos_kill_switch::ChannelListener;
use aigos_kill_switch::ControlHandler;
use aigos_kill_switch::EventSink;
use aigos_kill_switch::FileChannel;
use aigos_kill_switch::FileChannelConfig;
use aigos_kill_switch::KillSwitchReceiver;
use aigos_kill_switch::PollingChannel;
use aigos_kill_switch::PollingChannelConfig;
use aigos_kill_switch::PublicKey;
use aigos_kill_switch::ReceiverConfig;
use aigos_kill_switch::ReceiverIdentity;
use aigos_kill_switch::ReconnectPolicy;
use aigos_kill_switch::SignatureVerifier;
use aigos_kill_switch::SseChannel;
use aigos_kill_switch::SseChannelConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::keys::TrustedKeyConfig;
use crate::keys::decode_signing_key;
use crate::keys::read_key_material;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "aigos.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "AIGOS_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of trusted keys per key list.
pub(crate) const MAX_TRUSTED_KEYS: usize = 64;
/// Maximum length of identifiers (issuer, key ids, instance ids).
pub(crate) const MAX_IDENTIFIER_LENGTH: usize = 256;
/// Default token issuer.
const DEFAULT_ISSUER: &str = "aigos";
/// Default token audience.
const DEFAULT_AUDIENCE: &str = "aigos-agents";
/// Default signing key identifier.
const DEFAULT_KEY_ID: &str = "default";
/// Default token lifetime in seconds.
pub(crate) const DEFAULT_TOKEN_TTL_SECONDS: i64 = 300;
/// Maximum token lifetime in seconds.
pub(crate) const MAX_TOKEN_TTL_SECONDS: i64 = 86_400;
/// Default clock tolerance in seconds.
pub(crate) const DEFAULT_CLOCK_TOLERANCE_SECONDS: i64 = 30;
/// Maximum clock tolerance in seconds.
pub(crate) const MAX_CLOCK_TOLERANCE_SECONDS: i64 = 300;
/// Default approval grace period in days.
pub(crate) const DEFAULT_GRACE_PERIOD_DAYS: u32 = 365;
/// Maximum approval grace period in days.
pub(crate) const MAX_GRACE_PERIOD_DAYS: u32 = 3650;
/// Default poll interval in milliseconds.
pub(crate) const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
/// Minimum poll interval in milliseconds.
pub(crate) const MIN_POLL_INTERVAL_MS: u64 = 100;
/// Maximum poll interval in milliseconds.
pub(crate) const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;
/// Default reconnect attempt budget.
pub(crate) const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;
/// Maximum reconnect attempt budget.
pub(crate) const MAX_RECONNECT_ATTEMPTS: u32 = 1_000;
/// Default first reconnect delay in milliseconds.
pub(crate) const DEFAULT_RECONNECT_BASE_DELAY_MS: u64 = 1_000;
/// Minimum first reconnect delay in milliseconds.
pub(crate) const MIN_RECONNECT_BASE_DELAY_MS: u64 = 10;
/// Maximum first reconnect delay in milliseconds.
pub(crate) const MAX_RECONNECT_BASE_DELAY_MS: u64 = 60_000;
/// Default command timeout in milliseconds.
pub(crate) const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 60_000;
/// Minimum command timeout in milliseconds.
pub(crate) const MIN_COMMAND_TIMEOUT_MS: u64 = 100;
/// Maximum command timeout in milliseconds.
pub(crate) const MAX_COMMAND_TIMEOUT_MS: u64 = 600_000;
/// Default command age window in seconds.
pub(crate) const DEFAULT_MAX_COMMAND_AGE_SECONDS: i64 = 300;
/// Maximum command age window in seconds.
pub(crate) const MAX_COMMAND_AGE_SECONDS: i64 = 86_400;
/// Default nonce cache capacity.
pub(crate) const DEFAULT_NONCE_CACHE_SIZE: usize = 100;
/// Maximum nonce cache capacity.
pub(crate) const MAX_NONCE_CACHE_SIZE: usize = 100_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// AIGOS governance configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernanceConfig {
    /// Token issuance settings.
    #[serde(default)]
    pub token: TokenConfig,
    /// Keys trusted to sign governance tokens.
    #[serde(default)]
    pub trusted_keys: Vec<TrustedKeyConfig>,
    /// Token validation settings.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Golden thread approval settings.
    #[serde(default)]
    pub golden_thread: GoldenThreadConfig,
    /// Agent-to-agent policy settings.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Kill switch settings.
    #[serde(default)]
    pub kill_switch: KillSwitchConfig,
}

impl GovernanceConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is the explicit argument, else `AIGOS_CONFIG`, else
    /// `aigos.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.token.validate()?;
        validate_key_list("trusted_keys", &self.trusted_keys)?;
        for key in &self.trusted_keys {
            if !key.algorithm.eq_ignore_ascii_case("ed25519") {
                return Err(ConfigError::Invalid(format!(
                    "trusted_keys.{} must use Ed25519 for governance tokens",
                    key.key_id
                )));
            }
        }
        self.validation.validate()?;
        self.golden_thread.validate()?;
        self.policy.validate()?;
        self.kill_switch.validate()?;
        Ok(())
    }

    /// Builds a token generator from `[token]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no signing key is configured or the key
    /// material cannot be decoded.
    pub fn token_generator(&self, clock: Arc<dyn Clock>) -> Result<TokenGenerator, ConfigError> {
        let signing_key = self.token.signing_key()?.ok_or_else(|| {
            ConfigError::Invalid("token.signing_key is required to issue tokens".to_string())
        })?;
        Ok(TokenGenerator::new(self.token.generator_config(), signing_key, clock))
    }

    /// Builds a token validator from `[validation]` and `[[trusted_keys]]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a key cannot be loaded or no key is
    /// trusted.
    pub fn token_validator(&self, clock: Arc<dyn Clock>) -> Result<TokenValidator, ConfigError> {
        let mut keys = Vec::with_capacity(self.trusted_keys.len());
        for entry in &self.trusted_keys {
            let trusted = entry.load("trusted_keys")?;
            let PublicKey::Ed25519(key) = trusted.key else {
                return Err(ConfigError::Invalid(format!(
                    "trusted_keys.{} must use Ed25519 for governance tokens",
                    entry.key_id
                )));
            };
            keys.push((trusted.key_id, key));
        }
        TokenValidator::new(self.validation.validator_config(&self.token), keys, clock)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Builds a golden thread verifier from `[golden_thread]`.
    #[must_use]
    pub fn golden_thread_verifier(&self, clock: Arc<dyn Clock>) -> GoldenThreadVerifier {
        GoldenThreadVerifier::new(self.golden_thread.approval_policy(), clock)
    }

    /// Builds the inbound policy engine from `[policy.inbound]`.
    #[must_use]
    pub fn inbound_policy(&self) -> InboundPolicyEngine {
        InboundPolicyEngine::new(self.policy.inbound.clone())
    }

    /// Builds the outbound policy engine from `[policy.outbound]`.
    #[must_use]
    pub fn outbound_policy(&self) -> OutboundPolicyEngine {
        OutboundPolicyEngine::new(self.policy.outbound.clone())
    }
}

// ============================================================================
// SECTION: Token
// ============================================================================

/// Token issuance configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// Issuer claim placed in generated tokens.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Audience claim placed in generated tokens.
    #[serde(default = "default_audience")]
    pub audience: Audience,
    /// Key identifier placed in the token header.
    #[serde(default = "default_key_id")]
    pub key_id: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl_seconds")]
    pub ttl_seconds: i64,
    /// Clock tolerance applied to expiry and not-before checks.
    #[serde(default = "default_clock_tolerance_seconds")]
    pub clock_tolerance_seconds: i64,
    /// Inline Ed25519 signing key (base64 seed or PKCS#8 PEM).
    #[serde(default)]
    pub signing_key: Option<String>,
    /// Path to a file holding the Ed25519 signing key.
    #[serde(default)]
    pub signing_key_path: Option<PathBuf>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            audience: default_audience(),
            key_id: default_key_id(),
            ttl_seconds: default_token_ttl_seconds(),
            clock_tolerance_seconds: default_clock_tolerance_seconds(),
            signing_key: None,
            signing_key_path: None,
        }
    }
}

impl TokenConfig {
    /// Validates token settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("token.issuer", &self.issuer)?;
        validate_identifier("token.key_id", &self.key_id)?;
        match &self.audience {
            Audience::One(value) => validate_identifier("token.audience", value)?,
            Audience::Many(values) => {
                if values.is_empty() {
                    return Err(ConfigError::Invalid(
                        "token.audience must be non-empty".to_string(),
                    ));
                }
                for value in values {
                    validate_identifier("token.audience", value)?;
                }
            }
        }
        validate_range("token.ttl_seconds", self.ttl_seconds, 1, MAX_TOKEN_TTL_SECONDS)?;
        validate_range(
            "token.clock_tolerance_seconds",
            self.clock_tolerance_seconds,
            0,
            MAX_CLOCK_TOLERANCE_SECONDS,
        )?;
        if self.signing_key.is_some() && self.signing_key_path.is_some() {
            return Err(ConfigError::Invalid(
                "token.signing_key and token.signing_key_path are mutually exclusive".to_string(),
            ));
        }
        if let Some(path) = &self.signing_key_path {
            validate_path_string("token.signing_key_path", &path.to_string_lossy())?;
        }
        Ok(())
    }

    /// Returns the generator configuration for these settings.
    #[must_use]
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            key_id: self.key_id.clone(),
            default_ttl_seconds: self.ttl_seconds,
        }
    }

    /// Loads the configured signing key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the key file cannot be read or the key
    /// material is invalid.
    pub fn signing_key(&self) -> Result<Option<ed25519_dalek::SigningKey>, ConfigError> {
        if self.signing_key.is_none() && self.signing_key_path.is_none() {
            return Ok(None);
        }
        let material = read_key_material(
            "token.signing_key",
            self.signing_key.as_deref(),
            self.signing_key_path.as_deref(),
        )?;
        decode_signing_key(&material).map(Some)
    }
}

/// Default token issuer.
fn default_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

/// Default token audience.
fn default_audience() -> Audience {
    Audience::One(DEFAULT_AUDIENCE.to_string())
}

/// Default signing key identifier.
fn default_key_id() -> String {
    DEFAULT_KEY_ID.to_string()
}

/// Default token lifetime.
const fn default_token_ttl_seconds() -> i64 {
    DEFAULT_TOKEN_TTL_SECONDS
}

/// Default clock tolerance.
const fn default_clock_tolerance_seconds() -> i64 {
    DEFAULT_CLOCK_TOLERANCE_SECONDS
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Token validation configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Required issuer; defaults to `token.issuer` when unset.
    #[serde(default)]
    pub expected_issuer: Option<String>,
    /// Required audience; any audience is accepted when unset.
    #[serde(default)]
    pub expected_audience: Option<String>,
    /// Highest acceptable risk level.
    #[serde(default)]
    pub max_risk_level: Option<RiskLevel>,
    /// Reject tokens whose kill switch is not armed.
    #[serde(default)]
    pub require_kill_switch: bool,
}

impl ValidationConfig {
    /// Validates token validation settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(issuer) = &self.expected_issuer {
            validate_identifier("validation.expected_issuer", issuer)?;
        }
        if let Some(audience) = &self.expected_audience {
            validate_identifier("validation.expected_audience", audience)?;
        }
        Ok(())
    }

    /// Returns the validator configuration, falling back to the token issuer.
    #[must_use]
    pub fn validator_config(&self, token: &TokenConfig) -> ValidatorConfig {
        ValidatorConfig {
            expected_issuer: Some(
                self.expected_issuer.clone().unwrap_or_else(|| token.issuer.clone()),
            ),
            expected_audience: self.expected_audience.clone(),
            clock_tolerance_seconds: token.clock_tolerance_seconds,
            max_risk_level: self.max_risk_level,
            require_kill_switch: self.require_kill_switch,
        }
    }
}

// ============================================================================
// SECTION: Golden Thread
// ============================================================================

/// Golden thread approval configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoldenThreadConfig {
    /// Maximum approval age in days.
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: u32,
    /// Accept approvals older than the grace period.
    #[serde(default)]
    pub allow_expired: bool,
}

impl Default for GoldenThreadConfig {
    fn default() -> Self {
        Self {
            grace_period_days: default_grace_period_days(),
            allow_expired: false,
        }
    }
}

impl GoldenThreadConfig {
    /// Validates golden thread settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range(
            "golden_thread.grace_period_days",
            i64::from(self.grace_period_days),
            1,
            i64::from(MAX_GRACE_PERIOD_DAYS),
        )
    }

    /// Returns the approval policy for these settings.
    #[must_use]
    pub const fn approval_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy {
            grace_period_days: self.grace_period_days,
            allow_expired: self.allow_expired,
        }
    }
}

/// Default grace period.
const fn default_grace_period_days() -> u32 {
    DEFAULT_GRACE_PERIOD_DAYS
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Agent-to-agent policy configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Rules applied to callers.
    #[serde(default)]
    pub inbound: InboundPolicyConfig,
    /// Rules applied to callees and destinations.
    #[serde(default)]
    pub outbound: OutboundPolicyConfig,
}

impl PolicyConfig {
    /// Validates policy list entries.
    fn validate(&self) -> Result<(), ConfigError> {
        let inbound = &self.inbound;
        for (field, entries) in [
            ("policy.inbound.blocked_instances", &inbound.blocked_instances),
            ("policy.inbound.blocked_assets", &inbound.blocked_assets),
            ("policy.inbound.trusted_instances", &inbound.trusted_instances),
            ("policy.inbound.trusted_assets", &inbound.trusted_assets),
            ("policy.inbound.required_capabilities", &inbound.required_capabilities),
        ] {
            validate_entries(field, entries)?;
        }
        let outbound = &self.outbound;
        for (field, entries) in [
            ("policy.outbound.blocked_instances", &outbound.blocked_instances),
            ("policy.outbound.blocked_assets", &outbound.blocked_assets),
            ("policy.outbound.trusted_instances", &outbound.trusted_instances),
            ("policy.outbound.trusted_assets", &outbound.trusted_assets),
            ("policy.outbound.blocked_domains", &outbound.blocked_domains),
            ("policy.outbound.allowed_domains", &outbound.allowed_domains),
        ] {
            validate_entries(field, entries)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Kill Switch
// ============================================================================

/// Kill switch configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KillSwitchConfig {
    /// Whether the agent listens for operator commands.
    #[serde(default)]
    pub enabled: bool,
    /// Transport used to receive commands.
    #[serde(default)]
    pub channel: ControlChannel,
    /// Stream or polling URL, or the command file path for `file`.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Poll interval for the polling and file channels.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Reconnect attempts before the channel is declared failed.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect; doubles per attempt.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Hard limit on control callback execution.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Maximum accepted command age.
    #[serde(default = "default_max_command_age_seconds")]
    pub max_command_age_seconds: i64,
    /// Replay cache capacity.
    #[serde(default = "default_nonce_cache_size")]
    pub nonce_cache_size: usize,
    /// Whether RESUME may leave the paused state.
    #[serde(default = "default_true")]
    pub allow_resume: bool,
    /// Whether commands must carry a valid signature.
    #[serde(default = "default_true")]
    pub require_signature: bool,
    /// This agent's instance identifier.
    #[serde(default)]
    pub instance_id: Option<String>,
    /// This agent's asset identifier.
    #[serde(default)]
    pub asset_id: Option<String>,
    /// This agent's organization.
    #[serde(default)]
    pub organization: Option<String>,
    /// Keys trusted to sign operator commands.
    #[serde(default)]
    pub trusted_keys: Vec<TrustedKeyConfig>,
}

impl Default for KillSwitchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel: ControlChannel::default(),
            endpoint: None,
            poll_interval_ms: default_poll_interval_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            max_command_age_seconds: default_max_command_age_seconds(),
            nonce_cache_size: default_nonce_cache_size(),
            allow_resume: true,
            require_signature: true,
            instance_id: None,
            asset_id: None,
            organization: None,
            trusted_keys: Vec::new(),
        }
    }
}

impl KillSwitchConfig {
    /// Validates kill switch settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout_range(
            "kill_switch.poll_interval_ms",
            self.poll_interval_ms,
            MIN_POLL_INTERVAL_MS,
            MAX_POLL_INTERVAL_MS,
        )?;
        validate_timeout_range(
            "kill_switch.reconnect_base_delay_ms",
            self.reconnect_base_delay_ms,
            MIN_RECONNECT_BASE_DELAY_MS,
            MAX_RECONNECT_BASE_DELAY_MS,
        )?;
        validate_timeout_range(
            "kill_switch.command_timeout_ms",
            self.command_timeout_ms,
            MIN_COMMAND_TIMEOUT_MS,
            MAX_COMMAND_TIMEOUT_MS,
        )?;
        validate_range(
            "kill_switch.max_reconnect_attempts",
            i64::from(self.max_reconnect_attempts),
            1,
            i64::from(MAX_RECONNECT_ATTEMPTS),
        )?;
        validate_range(
            "kill_switch.max_command_age_seconds",
            self.max_command_age_seconds,
            1,
            MAX_COMMAND_AGE_SECONDS,
        )?;
        if self.nonce_cache_size == 0 || self.nonce_cache_size > MAX_NONCE_CACHE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "kill_switch.nonce_cache_size must be between 1 and {MAX_NONCE_CACHE_SIZE}"
            )));
        }
        for (field, value) in [
            ("kill_switch.instance_id", &self.instance_id),
            ("kill_switch.asset_id", &self.asset_id),
            ("kill_switch.organization", &self.organization),
        ] {
            if let Some(value) = value {
                validate_identifier(field, value)?;
            }
        }
        validate_key_list("kill_switch.trusted_keys", &self.trusted_keys)?;
        if self.enabled {
            self.validate_endpoint()?;
            if self.require_signature && self.trusted_keys.is_empty() {
                return Err(ConfigError::Invalid(
                    "kill_switch.trusted_keys must be non-empty when require_signature=true"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Validates the endpoint against the selected channel.
    fn validate_endpoint(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.as_deref().map(str::trim).unwrap_or_default();
        if endpoint.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "kill_switch.endpoint is required for the {} channel",
                self.channel
            )));
        }
        match self.channel {
            ControlChannel::Sse | ControlChannel::Polling => {
                self.endpoint_url().map(|_| ())
            }
            ControlChannel::File => validate_path_string("kill_switch.endpoint", endpoint),
        }
    }

    /// Parses the endpoint as an http(s) URL.
    fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let endpoint = self.endpoint.as_deref().map(str::trim).unwrap_or_default();
        let url = Url::parse(endpoint).map_err(|err| {
            ConfigError::Invalid(format!("kill_switch.endpoint is not a valid url: {err}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(
                "kill_switch.endpoint must use http or https".to_string(),
            ));
        }
        Ok(url)
    }

    /// Returns the identity matched against command targets.
    #[must_use]
    pub fn identity(&self) -> ReceiverIdentity {
        ReceiverIdentity {
            instance_id: self.instance_id.clone(),
            asset_id: self.asset_id.clone(),
            organization: self.organization.clone(),
        }
    }

    /// Returns the reconnect backoff policy.
    #[must_use]
    pub const fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(self.reconnect_base_delay_ms),
            max_attempts: self.max_reconnect_attempts,
        }
    }

    /// Returns the receiver configuration.
    #[must_use]
    pub fn receiver_config(&self) -> ReceiverConfig {
        ReceiverConfig {
            identity: self.identity(),
            require_signature: self.require_signature,
            allow_resume: self.allow_resume,
            command_timeout: Duration::from_millis(self.command_timeout_ms),
            max_command_age_seconds: self.max_command_age_seconds,
            nonce_cache_size: self.nonce_cache_size,
            reconnect: self.reconnect_policy(),
        }
    }

    /// Builds the command signature verifier from the trusted keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a key cannot be read or decoded.
    pub fn signature_verifier(
        &self,
        clock: Arc<dyn Clock>,
    ) -> Result<SignatureVerifier, ConfigError> {
        let keys = self
            .trusted_keys
            .iter()
            .map(|entry| entry.load("kill_switch.trusted_keys"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SignatureVerifier::new(keys, self.max_command_age_seconds, clock))
    }

    /// Builds the channel listener for the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the endpoint is missing or invalid.
    pub fn channel_listener(&self) -> Result<Box<dyn ChannelListener>, ConfigError> {
        self.validate_endpoint()?;
        let interval = Duration::from_millis(self.poll_interval_ms);
        let listener: Box<dyn ChannelListener> = match self.channel {
            ControlChannel::Sse => {
                let mut config = SseChannelConfig::new(self.endpoint_url()?);
                config.instance_id.clone_from(&self.instance_id);
                Box::new(SseChannel::new(config).map_err(channel_error)?)
            }
            ControlChannel::Polling => {
                let mut config = PollingChannelConfig::new(self.endpoint_url()?);
                config.interval = interval;
                config.instance_id.clone_from(&self.instance_id);
                Box::new(PollingChannel::new(config).map_err(channel_error)?)
            }
            ControlChannel::File => {
                let path = self.endpoint.as_deref().map(str::trim).unwrap_or_default();
                let mut config = FileChannelConfig::new(path);
                config.interval = interval;
                Box::new(FileChannel::new(config))
            }
        };
        Ok(listener)
    }

    /// Builds a receiver wired to the trusted keys and settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when keys cannot be loaded or signatures are
    /// required without a trusted key.
    pub fn build_receiver(
        &self,
        handler: Arc<dyn ControlHandler>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<KillSwitchReceiver, ConfigError> {
        let verifier = self.signature_verifier(Arc::clone(&clock))?;
        KillSwitchReceiver::new(self.receiver_config(), verifier, handler, events, clock)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

/// Default poll interval.
const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Default reconnect budget.
const fn default_max_reconnect_attempts() -> u32 {
    DEFAULT_MAX_RECONNECT_ATTEMPTS
}

/// Default first reconnect delay.
const fn default_reconnect_base_delay_ms() -> u64 {
    DEFAULT_RECONNECT_BASE_DELAY_MS
}

/// Default command timeout.
const fn default_command_timeout_ms() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_MS
}

/// Default command age window.
const fn default_max_command_age_seconds() -> i64 {
    DEFAULT_MAX_COMMAND_AGE_SECONDS
}

/// Default nonce cache capacity.
const fn default_nonce_cache_size() -> usize {
    DEFAULT_NONCE_CACHE_SIZE
}

/// Serde default for flags that are on unless disabled.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
pub(crate) fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a non-empty, bounded identifier.
pub(crate) fn validate_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "{field} exceeds {MAX_IDENTIFIER_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validates that every list entry is a non-empty identifier.
fn validate_entries(field: &str, entries: &[String]) -> Result<(), ConfigError> {
    for entry in entries {
        validate_identifier(field, entry)?;
    }
    Ok(())
}

/// Validates a trusted key list: bounded size, valid entries, unique ids.
fn validate_key_list(field: &str, keys: &[TrustedKeyConfig]) -> Result<(), ConfigError> {
    if keys.len() > MAX_TRUSTED_KEYS {
        return Err(ConfigError::Invalid(format!(
            "{field} exceeds {MAX_TRUSTED_KEYS} entries"
        )));
    }
    let mut seen = BTreeSet::new();
    for key in keys {
        key.validate(field)?;
        if !seen.insert(key.key_id.trim()) {
            return Err(ConfigError::Invalid(format!(
                "{field} contains duplicate key_id {}",
                key.key_id.trim()
            )));
        }
    }
    Ok(())
}

/// Validates a signed value against an inclusive range.
fn validate_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Validates a millisecond value against an inclusive range.
fn validate_timeout_range(
    field: &str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min_ms} and {max_ms} milliseconds",
        )));
    }
    Ok(())
}

/// Maps a channel construction error into a config error.
fn channel_error(err: aigos_kill_switch::ChannelError) -> ConfigError {
    ConfigError::Invalid(format!("kill_switch.endpoint: {err}"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::*;

    #[test]
    fn validate_timeout_range_accepts_bounds() {
        let (min, max) = (MIN_COMMAND_TIMEOUT_MS, MAX_COMMAND_TIMEOUT_MS);
        assert!(validate_timeout_range("t", min, min, max).is_ok());
        assert!(validate_timeout_range("t", max, min, max).is_ok());
        assert!(validate_timeout_range("t", min - 1, min, max).is_err());
        assert!(validate_timeout_range("t", max + 1, min, max).is_err());
    }

    #[test]
    fn validate_path_rejects_long_component() {
        let long = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        let err = validate_path(Path::new(&long)).unwrap_err();
        assert!(err.to_string().contains("component too long"));
    }

    #[test]
    fn resolve_path_prefers_explicit_path() {
        let resolved = resolve_path(Some(Path::new("custom.toml"))).unwrap();
        assert_eq!(resolved, PathBuf::from("custom.toml"));
    }
}
