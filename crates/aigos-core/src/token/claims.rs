// crates/aigos-core/src/token/claims.rs
// ============================================================================
// Module: AIGOS Token Claims
// Description: Standard bearer claims and the namespaced governance claim block.
// Purpose: Define the wire payload carried by governance tokens.
// Dependencies: serde, crate::identity
// ============================================================================

//! ## Overview
//! [`GovernanceTokenPayload`] is the full token payload. The governance
//! claims live under the `aigos` key so they never collide with registered
//! bearer-token claim names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identity::ControlChannel;
use crate::identity::OperatingMode;
use crate::identity::RiskLevel;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Payload key that holds the governance claim block.
pub const CLAIMS_NAMESPACE: &str = "aigos";

// ============================================================================
// SECTION: Standard Claims
// ============================================================================

/// Token audience: a single value or a list of accepted values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// Single audience.
    One(String),
    /// Multiple audiences.
    Many(Vec<String>),
}

impl Audience {
    /// Returns true when the audience contains the expected value.
    #[must_use]
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Self::One(value) => value == expected,
            Self::Many(values) => values.iter().any(|value| value == expected),
        }
    }
}

/// Full governance token payload.
///
/// # Invariants
/// - `sub` equals `claims.identity.instance_id`.
/// - `nbf == iat` and `exp == iat + ttl` at issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceTokenPayload {
    /// Issuer.
    pub iss: String,
    /// Subject (instance identifier).
    pub sub: String,
    /// Audience.
    pub aud: Audience,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Not-before (unix seconds).
    pub nbf: i64,
    /// Unique token identifier.
    pub jti: String,
    /// Namespaced governance claims.
    #[serde(rename = "aigos")]
    pub claims: GovernanceClaims,
}

// ============================================================================
// SECTION: Governance Claims
// ============================================================================

/// Namespaced governance claim block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceClaims {
    /// Asset and instance identity.
    pub identity: IdentityClaims,
    /// Risk, golden thread, and mode.
    pub governance: GovernanceStatusClaims,
    /// Kill switch and control flags.
    pub control: ControlClaims,
    /// Capability summary.
    pub capabilities: CapabilityClaims,
    /// Spawn lineage.
    pub lineage: LineageClaims,
}

/// Identity claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Instance identifier (UUID).
    pub instance_id: String,
    /// Asset identifier.
    pub asset_id: String,
    /// Asset name.
    pub asset_name: String,
    /// Asset version.
    pub asset_version: String,
}

/// Governance status claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceStatusClaims {
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Golden thread summary.
    pub golden_thread: GoldenThreadClaims,
    /// Operating mode.
    pub mode: OperatingMode,
}

/// Golden thread summary claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenThreadClaims {
    /// Golden thread hash.
    pub hash: String,
    /// Whether the issuer verified the hash.
    pub verified: bool,
    /// Approval ticket identifier.
    pub ticket_id: String,
}

/// Control-state claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlClaims {
    /// Kill switch status.
    pub kill_switch: KillSwitchClaims,
    /// Whether the agent is paused.
    pub paused: bool,
    /// Whether a termination is pending.
    pub termination_pending: bool,
}

/// Kill switch status claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitchClaims {
    /// Whether the kill switch receiver is armed.
    pub enabled: bool,
    /// Channel the receiver listens on.
    pub channel: ControlChannel,
}

/// Capability summary claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityClaims {
    /// Hash of the full capabilities manifest.
    pub hash: String,
    /// Allowed tool names.
    pub tools: Vec<String>,
    /// Budget ceiling in USD (`None` = unlimited).
    pub max_budget_usd: Option<f64>,
    /// Whether the agent may spawn children.
    pub can_spawn: bool,
    /// Maximum child spawn depth.
    pub max_child_depth: u32,
}

/// Lineage claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageClaims {
    /// Spawn depth from the root instance.
    pub generation_depth: u32,
    /// Parent instance identifier.
    pub parent_instance_id: Option<String>,
    /// Root instance identifier.
    pub root_instance_id: String,
}
