// crates/aigos-core/src/policy/outbound.rs
// ============================================================================
// Module: AIGOS Outbound Policy
// Description: Caller-side policy over destinations and callee claims.
// Purpose: Decide whether an outgoing A2A call may proceed and whether its response is trusted.
// Dependencies: serde, url, crate::{identity, token}
// ============================================================================

//! ## Overview
//! Outbound evaluation has two independent entry points:
//! - [`OutboundPolicyEngine::evaluate_url`] is a pre-flight check on the
//!   destination: `blocked_domain` then `allowed_domains_only`.
//! - [`OutboundPolicyEngine::evaluate`] checks the callee's claims on the
//!   mirrored response: `blocked_instance`, `blocked_asset`,
//!   `trusted_instances_only`, `trusted_assets_only`, `max_risk_level`,
//!   `require_kill_switch`, `require_golden_thread`, custom validator,
//!   `default_allow`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use url::Url;

use super::ClaimsValidator;
use super::DecisionObserver;
use super::DecisionRecord;
use super::PolicyDecision;
use super::PolicyDirection;
use super::apply_custom;
use super::check_golden_thread;
use super::check_identity_lists;
use super::check_risk_and_kill_switch;
use super::host::HostPattern;
use super::host::normalize_host;
use super::host::parse_host_patterns;
use super::rules;
use crate::identity::RiskLevel;
use crate::token::GovernanceClaims;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Outbound policy configuration. Empty lists and `None` disable a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutboundPolicyConfig {
    /// Callee instances that are always denied.
    pub blocked_instances: Vec<String>,
    /// Callee assets that are always denied.
    pub blocked_assets: Vec<String>,
    /// When non-empty, only these callee instances are trusted.
    pub trusted_instances: Vec<String>,
    /// When non-empty, only these callee assets are trusted.
    pub trusted_assets: Vec<String>,
    /// Destination domains that are always denied (exact or `*.suffix`).
    pub blocked_domains: Vec<String>,
    /// When non-empty, only these destination domains are allowed.
    pub allowed_domains: Vec<String>,
    /// Highest acceptable callee risk level.
    pub max_risk_level: Option<RiskLevel>,
    /// Require an armed callee kill switch.
    pub require_kill_switch: bool,
    /// Require a verified callee golden thread.
    pub require_golden_thread: bool,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Outbound policy engine.
#[derive(Clone, Default)]
pub struct OutboundPolicyEngine {
    /// Rule configuration.
    config: OutboundPolicyConfig,
    /// Parsed domain deny-list.
    blocked_domains: Vec<HostPattern>,
    /// Parsed domain allow-list (empty disables the rule).
    allowed_domains: Vec<HostPattern>,
    /// Optional trailing predicate.
    validator: Option<Arc<dyn ClaimsValidator>>,
    /// Decision observers.
    observers: Vec<Arc<dyn DecisionObserver>>,
}

impl OutboundPolicyEngine {
    /// Creates an engine for the provided configuration.
    #[must_use]
    pub fn new(config: OutboundPolicyConfig) -> Self {
        let blocked_domains = parse_host_patterns(&config.blocked_domains);
        let allowed_domains = parse_host_patterns(&config.allowed_domains);
        Self {
            config,
            blocked_domains,
            allowed_domains,
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
    pub const fn config(&self) -> &OutboundPolicyConfig {
        &self.config
    }

    /// Evaluates a destination URL before the call is made.
    #[must_use]
    pub fn evaluate_url(&self, target: &str) -> PolicyDecision {
        let decision = match Url::parse(target) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => match url.host_str() {
                Some(host) => self.decide_domain(host),
                None => PolicyDecision::deny(rules::INVALID_URL, "url has no host"),
            },
            Ok(url) => PolicyDecision::deny(
                rules::INVALID_URL,
                format!("unsupported url scheme: {}", url.scheme()),
            ),
            Err(err) => PolicyDecision::deny(rules::INVALID_URL, format!("invalid url: {err}")),
        };
        self.notify_target(target, &decision);
        decision
    }

    /// Evaluates a bare destination domain.
    #[must_use]
    pub fn evaluate_domain(&self, domain: &str) -> PolicyDecision {
        let decision = self.decide_domain(domain);
        self.notify_target(domain, &decision);
        decision
    }

    /// Evaluates the callee's claims from a mirrored response.
    #[must_use]
    pub fn evaluate(&self, claims: &GovernanceClaims) -> PolicyDecision {
        let decision = self.decide_claims(claims);
        let record = DecisionRecord::for_claims(PolicyDirection::Outbound, claims, &decision);
        for observer in &self.observers {
            observer.on_decision(&record);
        }
        decision
    }

    /// Applies the domain deny-list then allow-list.
    fn decide_domain(&self, domain: &str) -> PolicyDecision {
        let host = normalize_host(domain.trim_start_matches('[').trim_end_matches(']'));
        if self.blocked_domains.iter().any(|pattern| pattern.matches(&host)) {
            return PolicyDecision::deny(rules::BLOCKED_DOMAIN, format!("domain {host} is blocked"));
        }
        if !self.allowed_domains.is_empty()
            && !self.allowed_domains.iter().any(|pattern| pattern.matches(&host))
        {
            return PolicyDecision::deny(
                rules::ALLOWED_DOMAINS_ONLY,
                format!("domain {host} is not in the allowed domain list"),
            );
        }
        PolicyDecision::default_allow()
    }

    /// Runs the claims rule chain.
    fn decide_claims(&self, claims: &GovernanceClaims) -> PolicyDecision {
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
        if let Some(denied) = check_golden_thread(claims, config.require_golden_thread) {
            return denied;
        }
        if let Some(denied) = apply_custom(self.validator.as_deref(), claims) {
            return denied;
        }
        PolicyDecision::default_allow()
    }

    /// Notifies observers of a destination decision.
    fn notify_target(&self, target: &str, decision: &PolicyDecision) {
        if self.observers.is_empty() {
            return;
        }
        let record = DecisionRecord {
            direction: PolicyDirection::Outbound,
            counterpart_instance_id: None,
            counterpart_asset_id: None,
            target: Some(target.to_string()),
            decision: decision.clone(),
        };
        for observer in &self.observers {
            observer.on_decision(&record);
        }
    }
}
