// crates/aigos-core/src/token/generator.rs
// ============================================================================
// Module: AIGOS Token Generator
// Description: Builds and signs governance tokens from an agent identity.
// Purpose: Mint a short-lived token per outgoing A2A call.
// Dependencies: ed25519-dalek, serde_json, uuid, crate::{hashing, identity, time}
// ============================================================================

//! ## Overview
//! [`TokenGenerator`] holds the signing key immutably after construction and
//! is stateless per call: each [`TokenGenerator::generate`] assigns a fresh
//! token identifier, sets `iat = now`, `nbf = iat`, and `exp = iat + ttl`.
//! Negative TTLs are accepted so callers can mint already-expired tokens for
//! negative testing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::TokenError;
use super::claims::Audience;
use super::claims::CapabilityClaims;
use super::claims::ControlClaims;
use super::claims::GoldenThreadClaims;
use super::claims::GovernanceClaims;
use super::claims::GovernanceStatusClaims;
use super::claims::GovernanceTokenPayload;
use super::claims::IdentityClaims;
use super::claims::KillSwitchClaims;
use super::claims::LineageClaims;
use super::codec::TokenHeader;
use super::codec::encode_signed;
use crate::hashing::hash_canonical_json;
use crate::identity::ControlChannel;
use crate::identity::Identity;
use crate::time::Clock;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default token lifetime in seconds.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 300;

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Runtime control state embedded in every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    /// Whether the kill switch receiver is armed.
    pub kill_switch_enabled: bool,
    /// Channel the kill switch receiver listens on.
    pub channel: ControlChannel,
    /// Whether the agent is paused.
    pub paused: bool,
    /// Whether a termination is pending.
    pub termination_pending: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            kill_switch_enabled: true,
            channel: ControlChannel::Sse,
            paused: false,
            termination_pending: false,
        }
    }
}

/// Input for a single token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInput {
    /// Identity the token attests.
    pub identity: Identity,
    /// Control state at issuance.
    pub control: ControlState,
}

/// Per-call generation overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenOptions {
    /// Lifetime override in seconds (may be negative).
    pub ttl_seconds: Option<i64>,
    /// Audience override.
    pub audience: Option<Audience>,
}

/// Generator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Issuer claim.
    pub issuer: String,
    /// Default audience claim.
    pub audience: Audience,
    /// Key identifier placed in the token header.
    pub key_id: String,
    /// Default lifetime in seconds.
    pub default_ttl_seconds: i64,
}

impl GeneratorConfig {
    /// Creates a configuration with the default lifetime.
    #[must_use]
    pub fn new(issuer: impl Into<String>, audience: Audience, key_id: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience,
            key_id: key_id.into(),
            default_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }
}

/// Signed token with its decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedToken {
    /// Compact signed token.
    pub token: String,
    /// Payload that was signed.
    pub payload: GovernanceTokenPayload,
    /// Expiry in unix seconds.
    pub expires_at: i64,
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Governance token generator.
pub struct TokenGenerator {
    /// Generator configuration.
    config: GeneratorConfig,
    /// Ed25519 signing key.
    signing_key: SigningKey,
    /// Time source for temporal claims.
    clock: Arc<dyn Clock>,
}

impl TokenGenerator {
    /// Creates a generator bound to a signing key and clock.
    #[must_use]
    pub fn new(config: GeneratorConfig, signing_key: SigningKey, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            signing_key,
            clock,
        }
    }

    /// Builds a token input from an identity and its current control state.
    #[must_use]
    pub fn build_input(identity: &Identity, control: ControlState) -> TokenInput {
        TokenInput {
            identity: identity.clone(),
            control,
        }
    }

    /// Returns the generator configuration.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Returns the public half of the signing key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Generates and signs a governance token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Serialization`] when the claims cannot be encoded.
    pub fn generate(
        &self,
        input: &TokenInput,
        options: &TokenOptions,
    ) -> Result<GeneratedToken, TokenError> {
        let iat = self.clock.now_unix_seconds();
        let ttl = options.ttl_seconds.unwrap_or(self.config.default_ttl_seconds);
        let exp = iat.saturating_add(ttl);
        let payload = GovernanceTokenPayload {
            iss: self.config.issuer.clone(),
            sub: input.identity.instance_id.clone(),
            aud: options.audience.clone().unwrap_or_else(|| self.config.audience.clone()),
            exp,
            iat,
            nbf: iat,
            jti: Uuid::new_v4().to_string(),
            claims: build_claims(input)?,
        };
        let header = serde_json::to_vec(&TokenHeader::governance(&self.config.key_id))
            .map_err(|err| TokenError::Serialization(err.to_string()))?;
        let body =
            serde_json::to_vec(&payload).map_err(|err| TokenError::Serialization(err.to_string()))?;
        let token = encode_signed(&header, &body, &self.signing_key);
        Ok(GeneratedToken {
            token,
            payload,
            expires_at: exp,
        })
    }
}

// ============================================================================
// SECTION: Claim Construction
// ============================================================================

/// Builds the namespaced claim block from a token input.
fn build_claims(input: &TokenInput) -> Result<GovernanceClaims, TokenError> {
    let identity = &input.identity;
    let manifest = &identity.capabilities_manifest;
    let capability_hash = hash_canonical_json(manifest)
        .map_err(|err| TokenError::Serialization(err.to_string()))?;
    Ok(GovernanceClaims {
        identity: IdentityClaims {
            instance_id: identity.instance_id.clone(),
            asset_id: identity.asset_id.clone(),
            asset_name: identity.asset_name.clone(),
            asset_version: identity.asset_version.clone(),
        },
        governance: GovernanceStatusClaims {
            risk_level: identity.risk_level,
            golden_thread: GoldenThreadClaims {
                hash: identity.golden_thread_hash.clone(),
                verified: identity.verified,
                ticket_id: identity.golden_thread.ticket_id.clone(),
            },
            mode: identity.mode,
        },
        control: ControlClaims {
            kill_switch: KillSwitchClaims {
                enabled: input.control.kill_switch_enabled,
                channel: input.control.channel,
            },
            paused: input.control.paused,
            termination_pending: input.control.termination_pending,
        },
        capabilities: CapabilityClaims {
            hash: capability_hash,
            tools: manifest.allowed_tools.clone(),
            max_budget_usd: manifest.max_cost_per_session,
            can_spawn: manifest.may_spawn_children,
            max_child_depth: manifest.max_child_depth,
        },
        lineage: LineageClaims {
            generation_depth: identity.lineage.generation_depth,
            parent_instance_id: identity.lineage.parent_instance_id.clone(),
            root_instance_id: identity.lineage.root_instance_id.clone(),
        },
    })
}
