// crates/aigos-core/src/policy/mod.rs
// ============================================================================
// Module: AIGOS Policy Engines
// Description: Inbound and outbound A2A policy decisions over token claims.
// Purpose: Allow or deny agent-to-agent calls with an explainable matched rule.
// Dependencies: serde, url, crate::{identity, token}
// ============================================================================

//! ## Overview
//! Both engines are configuration-driven pure decision functions. Rules are
//! evaluated in a fixed order and the first match wins; a rule is active only
//! when its configuration field is set. Deny-lists are always consulted
//! before allow-lists, so deny wins over allow.
//! Invariants:
//! - Every evaluation produces a fresh [`PolicyDecision`].
//! - A denial always carries a reason and a matched rule name.
//!
//! Security posture: claims are assumed to come from a token the validator
//! already accepted; the engines do not re-verify signatures.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod host;
pub mod inbound;
pub mod outbound;

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::token::GovernanceClaims;

pub use host::HostPattern;
pub use inbound::InboundPolicyConfig;
pub use inbound::InboundPolicyEngine;
pub use outbound::OutboundPolicyConfig;
pub use outbound::OutboundPolicyEngine;

// ============================================================================
// SECTION: Rule Names
// ============================================================================

/// Stable rule names reported in [`PolicyDecision::matched_rule`].
pub mod rules {
    /// Counterpart instance is deny-listed.
    pub const BLOCKED_INSTANCE: &str = "blocked_instance";
    /// Counterpart asset is deny-listed.
    pub const BLOCKED_ASSET: &str = "blocked_asset";
    /// Target domain is deny-listed.
    pub const BLOCKED_DOMAIN: &str = "blocked_domain";
    /// Counterpart instance is not on the allow-list.
    pub const TRUSTED_INSTANCES_ONLY: &str = "trusted_instances_only";
    /// Counterpart asset is not on the allow-list.
    pub const TRUSTED_ASSETS_ONLY: &str = "trusted_assets_only";
    /// Target domain is not on the allow-list.
    pub const ALLOWED_DOMAINS_ONLY: &str = "allowed_domains_only";
    /// Counterpart risk level exceeds the ceiling.
    pub const MAX_RISK_LEVEL: &str = "max_risk_level";
    /// Counterpart kill switch is not armed.
    pub const REQUIRE_KILL_SWITCH: &str = "require_kill_switch";
    /// Counterpart lineage is too deep.
    pub const MAX_GENERATION_DEPTH: &str = "max_generation_depth";
    /// Counterpart golden thread is unverified.
    pub const REQUIRE_GOLDEN_THREAD: &str = "require_golden_thread";
    /// Counterpart lacks a required capability.
    pub const REQUIRED_CAPABILITIES: &str = "required_capabilities";
    /// Caller-supplied validator denied the call.
    pub const CUSTOM_VALIDATOR: &str = "custom_validator";
    /// Target URL could not be parsed.
    pub const INVALID_URL: &str = "invalid_url";
    /// No rule denied the call.
    pub const DEFAULT_ALLOW: &str = "default_allow";
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Whether the call is allowed.
    pub allowed: bool,
    /// Human-readable reason.
    pub reason: Option<String>,
    /// Name of the rule that decided the outcome.
    pub matched_rule: Option<String>,
}

impl PolicyDecision {
    /// Builds an allow decision attributed to `rule`.
    #[must_use]
    pub fn allow(rule: &str) -> Self {
        Self {
            allowed: true,
            reason: None,
            matched_rule: Some(rule.to_string()),
        }
    }

    /// Builds a deny decision attributed to `rule`.
    #[must_use]
    pub fn deny(rule: &str, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            matched_rule: Some(rule.to_string()),
        }
    }

    /// Builds the terminal default allow decision.
    #[must_use]
    pub fn default_allow() -> Self {
        Self::allow(rules::DEFAULT_ALLOW)
    }
}

// ============================================================================
// SECTION: Extension Points
// ============================================================================

/// Caller-supplied predicate evaluated after all built-in rules.
///
/// A denial is passed through unchanged; a denial without a matched rule is
/// attributed to [`rules::CUSTOM_VALIDATOR`].
pub trait ClaimsValidator: Send + Sync {
    /// Evaluates counterpart claims.
    fn validate(&self, claims: &GovernanceClaims) -> PolicyDecision;
}

impl<F> ClaimsValidator for F
where
    F: Fn(&GovernanceClaims) -> PolicyDecision + Send + Sync,
{
    fn validate(&self, claims: &GovernanceClaims) -> PolicyDecision {
        self(claims)
    }
}

/// Direction of the evaluated call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDirection {
    /// Incoming call evaluated by the callee.
    Inbound,
    /// Outgoing call or response evaluated by the caller.
    Outbound,
}

/// Decision record handed to observers for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Call direction.
    pub direction: PolicyDirection,
    /// Counterpart instance, when claims were evaluated.
    pub counterpart_instance_id: Option<String>,
    /// Counterpart asset, when claims were evaluated.
    pub counterpart_asset_id: Option<String>,
    /// Target URL or domain, when a destination was evaluated.
    pub target: Option<String>,
    /// Decision reached.
    pub decision: PolicyDecision,
}

impl DecisionRecord {
    /// Builds a record for a claims evaluation.
    fn for_claims(
        direction: PolicyDirection,
        claims: &GovernanceClaims,
        decision: &PolicyDecision,
    ) -> Self {
        Self {
            direction,
            counterpart_instance_id: Some(claims.identity.instance_id.clone()),
            counterpart_asset_id: Some(claims.identity.asset_id.clone()),
            target: None,
            decision: decision.clone(),
        }
    }
}

/// Receives every decision an engine reaches.
pub trait DecisionObserver: Send + Sync {
    /// Records a decision.
    fn on_decision(&self, record: &DecisionRecord);
}

// ============================================================================
// SECTION: Shared Rules
// ============================================================================

/// Applies the trailing custom validator rule.
fn apply_custom(
    validator: Option<&dyn ClaimsValidator>,
    claims: &GovernanceClaims,
) -> Option<PolicyDecision> {
    let mut decision = validator?.validate(claims);
    if decision.allowed {
        return None;
    }
    if decision.matched_rule.is_none() {
        decision.matched_rule = Some(rules::CUSTOM_VALIDATOR.to_string());
    }
    if decision.reason.is_none() {
        decision.reason = Some("custom validator denied the call".to_string());
    }
    Some(decision)
}

/// Checks identifier deny and allow lists for a counterpart.
fn check_identity_lists(
    claims: &GovernanceClaims,
    blocked_instances: &[String],
    blocked_assets: &[String],
    trusted_instances: &[String],
    trusted_assets: &[String],
) -> Option<PolicyDecision> {
    let instance_id = &claims.identity.instance_id;
    let asset_id = &claims.identity.asset_id;
    if blocked_instances.contains(instance_id) {
        return Some(PolicyDecision::deny(
            rules::BLOCKED_INSTANCE,
            format!("instance {instance_id} is blocked"),
        ));
    }
    if blocked_assets.contains(asset_id) {
        return Some(PolicyDecision::deny(
            rules::BLOCKED_ASSET,
            format!("asset {asset_id} is blocked"),
        ));
    }
    if !trusted_instances.is_empty() && !trusted_instances.contains(instance_id) {
        return Some(PolicyDecision::deny(
            rules::TRUSTED_INSTANCES_ONLY,
            format!("instance {instance_id} is not in the trusted instance list"),
        ));
    }
    if !trusted_assets.is_empty() && !trusted_assets.contains(asset_id) {
        return Some(PolicyDecision::deny(
            rules::TRUSTED_ASSETS_ONLY,
            format!("asset {asset_id} is not in the trusted asset list"),
        ));
    }
    None
}

/// Checks the risk ceiling and the kill switch requirement.
fn check_risk_and_kill_switch(
    claims: &GovernanceClaims,
    max_risk_level: Option<crate::identity::RiskLevel>,
    require_kill_switch: bool,
) -> Option<PolicyDecision> {
    let risk = claims.governance.risk_level;
    if let Some(ceiling) = max_risk_level
        && risk.exceeds(ceiling)
    {
        return Some(PolicyDecision::deny(
            rules::MAX_RISK_LEVEL,
            format!("risk level {risk} exceeds maximum {ceiling}"),
        ));
    }
    if require_kill_switch && !claims.control.kill_switch.enabled {
        return Some(PolicyDecision::deny(
            rules::REQUIRE_KILL_SWITCH,
            "counterpart kill switch is not enabled",
        ));
    }
    None
}

/// Checks the golden thread verification requirement.
fn check_golden_thread(claims: &GovernanceClaims, required: bool) -> Option<PolicyDecision> {
    let thread = &claims.governance.golden_thread;
    if required && !thread.verified {
        let reason = if thread.ticket_id.trim().is_empty() {
            "golden thread is not verified".to_string()
        } else {
            format!("golden thread for ticket {} is not verified", thread.ticket_id)
        };
        return Some(PolicyDecision::deny(rules::REQUIRE_GOLDEN_THREAD, reason));
    }
    None
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
