// crates/aigos-kill-switch/src/command.rs
// ============================================================================
// Module: Kill Switch Commands
// Description: Command wire format, agent states, and command targeting.
// Purpose: Define what an operator can send and whom it addresses.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`KillSwitchCommand`] is created and signed by an operator tool,
//! transmitted over exactly one channel, and consumed at most once per
//! receiving instance.
//! Invariants:
//! - Commands are never mutated after signing.
//! - A command with no target fields addresses every instance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Command Types
// ============================================================================

/// Operator command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    /// Permanently stop the agent.
    Terminate,
    /// Suspend the agent.
    Pause,
    /// Resume a paused agent.
    Resume,
}

impl CommandType {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Terminate => "TERMINATE",
            Self::Pause => "PAUSE",
            Self::Resume => "RESUME",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent lifecycle state owned by the receiver.
///
/// # Invariants
/// - `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    /// Running normally.
    #[default]
    Active,
    /// Suspended by an operator.
    Paused,
    /// Permanently stopped.
    Terminated,
}

impl AgentState {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Command
// ============================================================================

/// Signed operator command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillSwitchCommand {
    /// Globally unique nonce.
    pub command_id: String,
    /// Command kind.
    #[serde(rename = "type")]
    pub command_type: CommandType,
    /// Detached signature (`ALGORITHM:base64[:key-id]`).
    #[serde(default)]
    pub signature: String,
    /// Issue time (RFC 3339).
    pub timestamp: String,
    /// Operator-supplied reason.
    #[serde(default)]
    pub reason: String,
    /// Operator identity.
    #[serde(default)]
    pub issued_by: String,
    /// Target instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    /// Target asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    /// Target organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl KillSwitchCommand {
    /// Returns true when the command carries no target fields.
    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.instance_id.is_none() && self.asset_id.is_none() && self.organization.is_none()
    }
}

// ============================================================================
// SECTION: Targeting
// ============================================================================

/// Identity a receiver matches commands against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverIdentity {
    /// This agent's instance identifier.
    pub instance_id: Option<String>,
    /// This agent's asset identifier.
    pub asset_id: Option<String>,
    /// This agent's organization.
    pub organization: Option<String>,
}

impl ReceiverIdentity {
    /// Returns true when every target field on the command is unset or equal.
    #[must_use]
    pub fn is_targeted_by(&self, command: &KillSwitchCommand) -> bool {
        field_matches(command.instance_id.as_deref(), self.instance_id.as_deref())
            && field_matches(command.asset_id.as_deref(), self.asset_id.as_deref())
            && field_matches(command.organization.as_deref(), self.organization.as_deref())
    }
}

/// Matches one target field.
fn field_matches(target: Option<&str>, own: Option<&str>) -> bool {
    target.is_none_or(|target| Some(target) == own)
}
