// crates/aigos-core/src/identity.rs
// ============================================================================
// Module: AIGOS Runtime Identity
// Description: Identity, lineage, capability, and classification types.
// Purpose: Model the externally constructed agent identity consumed by the core.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`Identity`] is built once per running agent instance by an external
//! identity-construction step. The core only reads it: the token generator
//! projects it into claims and the golden thread verifier checks its
//! approval hash.
//! Invariants:
//! - [`RiskLevel`] is totally ordered: minimal < limited < high < unacceptable.
//! - `golden_thread_hash` must equal the hash of `golden_thread` for
//!   `verified` to be meaningful.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Risk Classification
// ============================================================================

/// Risk classification of an AI asset.
///
/// # Invariants
/// - Variant order defines the total order used by risk ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Minimal risk.
    Minimal,
    /// Limited risk (transparency obligations).
    Limited,
    /// High risk.
    High,
    /// Unacceptable risk (prohibited).
    Unacceptable,
}

impl RiskLevel {
    /// All risk levels in ascending order.
    pub const ALL: [Self; 4] = [Self::Minimal, Self::Limited, Self::High, Self::Unacceptable];

    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Limited => "limited",
            Self::High => "high",
            Self::Unacceptable => "unacceptable",
        }
    }

    /// Returns true when this level exceeds the provided ceiling.
    #[must_use]
    pub fn exceeds(self, ceiling: Self) -> bool {
        self > ceiling
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == value)
            .ok_or_else(|| format!("unknown risk level: {value}"))
    }
}

// ============================================================================
// SECTION: Operating Mode
// ============================================================================

/// Runtime operating mode of an agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatingMode {
    /// Full capabilities as declared.
    #[default]
    Normal,
    /// Isolated execution without external side effects.
    Sandbox,
    /// Reduced capabilities after a governance intervention.
    Restricted,
}

impl OperatingMode {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Sandbox => "SANDBOX",
            Self::Restricted => "RESTRICTED",
        }
    }
}

// ============================================================================
// SECTION: Control Channel
// ============================================================================

/// Transport used by the kill switch to reach an agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControlChannel {
    /// Push stream (server-sent events).
    #[default]
    Sse,
    /// HTTP polling with a checkpoint cursor.
    Polling,
    /// Local file watched by modification time.
    File,
}

impl ControlChannel {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sse => "sse",
            Self::Polling => "polling",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ControlChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Golden Thread
// ============================================================================

/// Human approval that authorized a deployment.
///
/// # Invariants
/// - Field values are hashed literally; no normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenThread {
    /// Change or approval ticket identifier.
    pub ticket_id: String,
    /// Approver identity (email).
    pub approved_by: String,
    /// Approval timestamp (RFC 3339).
    pub approved_at: String,
}

// ============================================================================
// SECTION: Lineage
// ============================================================================

/// Spawn lineage of an agent instance.
///
/// # Invariants
/// - `generation_depth == 0` exactly when `parent_instance_id` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    /// Parent instance identifier (root agents have none).
    pub parent_instance_id: Option<String>,
    /// Number of spawn hops from the root instance.
    pub generation_depth: u32,
    /// Ancestor instance identifiers, root first.
    #[serde(default)]
    pub ancestor_chain: Vec<String>,
    /// Root instance identifier.
    pub root_instance_id: String,
}

impl Lineage {
    /// Creates the lineage of a root instance.
    #[must_use]
    pub fn root(instance_id: impl Into<String>) -> Self {
        Self {
            parent_instance_id: None,
            generation_depth: 0,
            ancestor_chain: Vec::new(),
            root_instance_id: instance_id.into(),
        }
    }
}

// ============================================================================
// SECTION: Capabilities Manifest
// ============================================================================

/// Declared tools, domains, and budgets for an agent instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CapabilitiesManifest {
    /// Allowed tool-name patterns.
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    /// Denied tool-name patterns.
    #[serde(default)]
    pub denied_tools: Vec<String>,
    /// Allowed domain patterns.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// Denied domain patterns.
    #[serde(default)]
    pub denied_domains: Vec<String>,
    /// Budget ceiling per session in USD (`None` = unlimited).
    #[serde(default)]
    pub max_cost_per_session: Option<f64>,
    /// Budget ceiling per day in USD (`None` = unlimited).
    #[serde(default)]
    pub max_cost_per_day: Option<f64>,
    /// Token ceiling per model call (`None` = unlimited).
    #[serde(default)]
    pub max_tokens_per_call: Option<u64>,
    /// Whether the instance may spawn child agents.
    #[serde(default)]
    pub may_spawn_children: bool,
    /// Maximum spawn depth below this instance.
    #[serde(default)]
    pub max_child_depth: u32,
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Runtime identity of an agent instance.
///
/// # Invariants
/// - `instance_id` is a UUID unique to the running instance.
/// - `verified` is only meaningful when `golden_thread_hash` matches `golden_thread`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique instance identifier (UUID).
    pub instance_id: String,
    /// Registered asset identifier.
    pub asset_id: String,
    /// Human-readable asset name.
    pub asset_name: String,
    /// Asset version string.
    pub asset_version: String,
    /// Risk classification.
    pub risk_level: RiskLevel,
    /// Golden thread hash recorded at approval time.
    pub golden_thread_hash: String,
    /// Golden thread components.
    pub golden_thread: GoldenThread,
    /// Spawn lineage.
    pub lineage: Lineage,
    /// Declared capabilities.
    pub capabilities_manifest: CapabilitiesManifest,
    /// Operating mode.
    #[serde(default)]
    pub mode: OperatingMode,
    /// Whether the golden thread hash was verified.
    #[serde(default)]
    pub verified: bool,
}
