// crates/aigos-core/src/policy/inbound.rs
// ============================================================================
// Module: AIGOS Inbound Policy
// Description: Callee-side policy over a caller's validated token claims.
// Purpose: Decide whether an incoming A2A call is accepted.
// Dependencies: serde, crate::{identity, token}
// ============================================================================

//! ## Overview
//! Rule order (first match wins):
//! 1. `blocked_instance`, `blocked_asset`
//! 2. `trusted_instances_only`, `trusted_assets_only`
//! 3. `max_risk_level`
//! 4. `require_kill_switch`
//! 5. `max_generation_depth`
//! 6. `require_golden_thread`
//! 7. `required_capabilities`
//! 8. custom validator
//! 9. `default_allow`

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use super::ClaimsValidator;
use super::DecisionObserver;
use super::DecisionRecord;
use super::PolicyDecision;
use super::PolicyDirection;
use super::apply_custom;
use super::check_golden_thread;
use super::check_identity_lists;
use super::check_risk_and_kill_switch;
use super::rules;
use crate::identity::RiskLevel;
use crate::token::GovernanceClaims;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Inbound policy configuration. Empty lists and `None` disable a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InboundPolicyConfig {
    /// Instances that are always denied.
    pub blocked_instances: Vec<String>,
    /// Assets that are always denied.
    pub blocked_assets: Vec<String>,
    /// When non-empty, only these instances are accepted.
    pub trusted_instances: Vec<String>,
    /// When non-empty, only these assets are accepted.
    pub trusted_assets: Vec<String>,
    /// Highest acceptable counterpart risk level.
    pub max_risk_level: Option<RiskLevel>,
    /// Require an armed counterpart kill switch.
    pub require_kill_switch: bool,
    /// Deepest acceptable counterpart lineage.
    pub max_generation_depth: Option<u32>,
    /// Require a verified counterpart golden thread.
    pub require_golden_thread: bool,
    /// Tools the counterpart must hold.
    pub required_capabilities: Vec<String>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Inbound policy engine.
#[derive(Clone, Default)]
pub struct InboundPolicyEngine {
    /// Rule configuration.
    config: InboundPolicyConfig,
    /// Optional trailing predicate.
    validator: Option<Arc<dyn ClaimsValidator>>,
    /// Decision observers.
    observers: Vec<Arc<dyn DecisionObserver>>,
}

impl InboundPolicyEngine {
    /// Creates an engine for the provided configuration.
    #[must_use]
    pub fn new(config: InboundPolicyConfig) -> Self {
        Self {
            config,
            validator: None,
            observers: Vec::new(),
        }
    }

    /// Installs a custom validator evaluated after the built-in rules.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn ClaimsValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Registers a decision observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DecisionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Returns the rule configuration.
    #[must_use]
    pub const fn config(&self) -> &InboundPolicyConfig {
        &self.config
    }

    /// Evaluates a caller's claims.
    #[must_use]
    pub fn evaluate(&self, claims: &GovernanceClaims) -> PolicyDecision {
        let decision = self.decide(claims);
        let record = DecisionRecord::for_claims(PolicyDirection::Inbound, claims, &decision);
        for observer in &self.observers {
            observer.on_decision(&record);
        }
        decision
    }

    /// Runs the rule chain.
    fn decide(&self, claims: &GovernanceClaims) -> PolicyDecision {
        let config = &self.config;
        if let Some(denied) = check_identity_lists(
            claims,
            &config.blocked_instances,
            &config.blocked_assets,
            &config.trusted_instances,
            &config.trusted_assets,
        ) {
            return denied;
        }
        if let Some(denied) =
            check_risk_and_kill_switch(claims, config.max_risk_level, config.require_kill_switch)
        {
            return denied;
        }
        let depth = claims.lineage.generation_depth;
        if let Some(max_depth) = config.max_generation_depth
            && depth > max_depth
        {
            return PolicyDecision::deny(
                rules::MAX_GENERATION_DEPTH,
                format!("generation depth {depth} exceeds maximum {max_depth}"),
            );
        }
        if let Some(denied) = check_golden_thread(claims, config.require_golden_thread) {
            return denied;
        }
        let missing: Vec<&str> = config
            .required_capabilities
            .iter()
            .filter(|tool| !claims.capabilities.tools.contains(tool))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return PolicyDecision::deny(
                rules::REQUIRED_CAPABILITIES,
                format!("missing required capabilities: {}", missing.join(", ")),
            );
        }
        if let Some(denied) = apply_custom(self.validator.as_deref(), claims) {
            return denied;
        }
        PolicyDecision::default_allow()
    }
}
