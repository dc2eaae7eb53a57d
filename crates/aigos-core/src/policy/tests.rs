// crates/aigos-core/src/policy/tests.rs
// ============================================================================
// Module: Policy Unit Tests
// Description: Tests for host patterns, rule precedence, and extension points.
// Purpose: Pin first-match-wins ordering and deny-before-allow semantics.
// Dependencies: aigos-core
// ============================================================================

//! ## Overview
//! Builds claim blocks directly and exercises both engines rule by rule.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use super::DecisionObserver;
use super::DecisionRecord;
use super::HostPattern;
use super::InboundPolicyConfig;
use super::InboundPolicyEngine;
use super::OutboundPolicyConfig;
use super::OutboundPolicyEngine;
use super::PolicyDecision;
use super::PolicyDirection;
use super::rules;
use crate::identity::ControlChannel;
use crate::identity::OperatingMode;
use crate::identity::RiskLevel;
use crate::token::CapabilityClaims;
use crate::token::ControlClaims;
use crate::token::GovernanceClaims;
use crate::token::GovernanceStatusClaims;
use crate::token::IdentityClaims;
use crate::token::LineageClaims;
use crate::token::claims::GoldenThreadClaims;
use crate::token::claims::KillSwitchClaims;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn claims() -> GovernanceClaims {
    GovernanceClaims {
        identity: IdentityClaims {
            instance_id: "instance-a".to_string(),
            asset_id: "asset-a".to_string(),
            asset_name: "research-agent".to_string(),
            asset_version: "2.1.0".to_string(),
        },
        governance: GovernanceStatusClaims {
            risk_level: RiskLevel::Limited,
            golden_thread: GoldenThreadClaims {
                hash: format!("sha256:{}", "a".repeat(64)),
                verified: true,
                ticket_id: "PROJ-7".to_string(),
            },
            mode: OperatingMode::Normal,
        },
        control: ControlClaims {
            kill_switch: KillSwitchClaims {
                enabled: true,
                channel: ControlChannel::Sse,
            },
            paused: false,
            termination_pending: false,
        },
        capabilities: CapabilityClaims {
            hash: format!("sha256:{}", "b".repeat(64)),
            tools: vec!["search".to_string(), "summarize".to_string()],
            max_budget_usd: Some(10.0),
            can_spawn: true,
            max_child_depth: 2,
        },
        lineage: LineageClaims {
            generation_depth: 1,
            parent_instance_id: Some("instance-root".to_string()),
            root_instance_id: "instance-root".to_string(),
        },
    }
}

fn rule(decision: &PolicyDecision) -> &str {
    decision.matched_rule.as_deref().unwrap()
}

#[derive(Default)]
struct Recorder {
    records: Mutex<Vec<DecisionRecord>>,
}

impl DecisionObserver for Recorder {
    fn on_decision(&self, record: &DecisionRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

// ============================================================================
// SECTION: Host Pattern Tests
// ============================================================================

#[test]
fn host_patterns_normalize_and_match() {
    let exact = HostPattern::parse(" API.Example.com. ").unwrap();
    assert!(exact.matches("api.example.com"));
    assert!(!exact.matches("www.api.example.com"));

    let wildcard = HostPattern::parse("*.example.com").unwrap();
    assert!(wildcard.matches("api.example.com"));
    assert!(!wildcard.matches("example.com"));
    assert!(!wildcard.matches("badexample.com"));

    assert_eq!(HostPattern::parse("*"), Some(HostPattern::Any));
    assert_eq!(HostPattern::parse("*."), None);
    assert_eq!(HostPattern::parse("   "), None);
}

// ============================================================================
// SECTION: Inbound Tests
// ============================================================================

#[test]
fn empty_inbound_config_allows_by_default() {
    let decision = InboundPolicyEngine::default().evaluate(&claims());
    assert!(decision.allowed);
    assert_eq!(rule(&decision), rules::DEFAULT_ALLOW);
}

#[test]
fn deny_list_wins_over_allow_list() {
    let engine = InboundPolicyEngine::new(InboundPolicyConfig {
        blocked_instances: vec!["instance-a".to_string()],
        trusted_instances: vec!["instance-a".to_string()],
        ..InboundPolicyConfig::default()
    });
    let decision = engine.evaluate(&claims());
    assert!(!decision.allowed);
    assert_eq!(rule(&decision), rules::BLOCKED_INSTANCE);
}

#[test]
fn non_empty_allow_list_denies_absent_assets() {
    let engine = InboundPolicyEngine::new(InboundPolicyConfig {
        trusted_assets: vec!["asset-b".to_string()],
        ..InboundPolicyConfig::default()
    });
    assert_eq!(rule(&engine.evaluate(&claims())), rules::TRUSTED_ASSETS_ONLY);
}

#[test]
fn inbound_rules_fire_in_declared_order() {
    let mut config = InboundPolicyConfig {
        max_risk_level: Some(RiskLevel::Minimal),
        require_kill_switch: true,
        max_generation_depth: Some(0),
        require_golden_thread: true,
        required_capabilities: vec!["browse".to_string()],
        ..InboundPolicyConfig::default()
    };
    let mut input = claims();
    input.control.kill_switch.enabled = false;
    input.governance.golden_thread.verified = false;

    let expected = [
        rules::MAX_RISK_LEVEL,
        rules::REQUIRE_KILL_SWITCH,
        rules::MAX_GENERATION_DEPTH,
        rules::REQUIRE_GOLDEN_THREAD,
        rules::REQUIRED_CAPABILITIES,
    ];
    for expected_rule in expected {
        let decision = InboundPolicyEngine::new(config.clone()).evaluate(&input);
        assert_eq!(rule(&decision), expected_rule);
        match expected_rule {
            rules::MAX_RISK_LEVEL => config.max_risk_level = None,
            rules::REQUIRE_KILL_SWITCH => config.require_kill_switch = false,
            rules::MAX_GENERATION_DEPTH => config.max_generation_depth = None,
            rules::REQUIRE_GOLDEN_THREAD => config.require_golden_thread = false,
            _ => config.required_capabilities.clear(),
        }
    }
    assert!(InboundPolicyEngine::new(config).evaluate(&input).allowed);
}

#[test]
fn risk_ceiling_is_ordinal() {
    let engine = InboundPolicyEngine::new(InboundPolicyConfig {
        max_risk_level: Some(RiskLevel::High),
        ..InboundPolicyConfig::default()
    });
    let mut input = claims();
    for level in [RiskLevel::Minimal, RiskLevel::Limited, RiskLevel::High] {
        input.governance.risk_level = level;
        assert!(engine.evaluate(&input).allowed, "{level} should pass");
    }
    input.governance.risk_level = RiskLevel::Unacceptable;
    assert_eq!(rule(&engine.evaluate(&input)), rules::MAX_RISK_LEVEL);
}

#[test]
fn custom_validator_runs_last_with_default_rule_tag() {
    let validator = Arc::new(|claims: &GovernanceClaims| {
        if claims.governance.mode == OperatingMode::Normal {
            PolicyDecision {
                allowed: false,
                reason: None,
                matched_rule: None,
            }
        } else {
            PolicyDecision::default_allow()
        }
    });
    let engine = InboundPolicyEngine::default().with_validator(validator);
    let decision = engine.evaluate(&claims());
    assert!(!decision.allowed);
    assert_eq!(rule(&decision), rules::CUSTOM_VALIDATOR);
    assert!(decision.reason.is_some());
}

#[test]
fn custom_validator_tag_is_passed_through() {
    let validator =
        Arc::new(|_: &GovernanceClaims| PolicyDecision::deny("business_hours", "outside hours"));
    let engine = InboundPolicyEngine::default().with_validator(validator);
    let decision = engine.evaluate(&claims());
    assert_eq!(rule(&decision), "business_hours");
    assert_eq!(decision.reason.as_deref(), Some("outside hours"));
}

#[test]
fn observers_receive_inbound_decisions() {
    let recorder = Arc::new(Recorder::default());
    let engine = InboundPolicyEngine::default().with_observer(recorder.clone());
    let _ = engine.evaluate(&claims());
    let records = recorder.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].direction, PolicyDirection::Inbound);
    assert_eq!(records[0].counterpart_instance_id.as_deref(), Some("instance-a"));
}

// ============================================================================
// SECTION: Outbound Tests
// ============================================================================

#[test]
fn outbound_domain_deny_wins_over_allow() {
    let engine = OutboundPolicyEngine::new(OutboundPolicyConfig {
        blocked_domains: vec!["evil.example.com".to_string()],
        allowed_domains: vec!["*.example.com".to_string()],
        ..OutboundPolicyConfig::default()
    });
    let denied = engine.evaluate_url("https://evil.example.com/a2a");
    assert_eq!(rule(&denied), rules::BLOCKED_DOMAIN);
    let allowed = engine.evaluate_url("https://agents.example.com:8443/a2a");
    assert!(allowed.allowed);
    let outside = engine.evaluate_domain("other.org");
    assert_eq!(rule(&outside), rules::ALLOWED_DOMAINS_ONLY);
}

#[test]
fn outbound_url_preflight_rejects_unusable_urls() {
    let engine = OutboundPolicyEngine::default();
    assert_eq!(rule(&engine.evaluate_url("not a url")), rules::INVALID_URL);
    assert_eq!(rule(&engine.evaluate_url("ftp://files.example.com")), rules::INVALID_URL);
    assert!(engine.evaluate_url("http://127.0.0.1:9000/").allowed);
}

#[test]
fn outbound_claims_use_shared_rules() {
    let engine = OutboundPolicyEngine::new(OutboundPolicyConfig {
        blocked_assets: vec!["asset-a".to_string()],
        ..OutboundPolicyConfig::default()
    });
    assert_eq!(rule(&engine.evaluate(&claims())), rules::BLOCKED_ASSET);

    let engine = OutboundPolicyEngine::new(OutboundPolicyConfig {
        require_golden_thread: true,
        ..OutboundPolicyConfig::default()
    });
    let mut input = claims();
    input.governance.golden_thread.verified = false;
    assert_eq!(rule(&engine.evaluate(&input)), rules::REQUIRE_GOLDEN_THREAD);
}

#[test]
fn observers_receive_outbound_targets() {
    let recorder = Arc::new(Recorder::default());
    let engine = OutboundPolicyEngine::default().with_observer(recorder.clone());
    let _ = engine.evaluate_url("https://api.example.com");
    let records = recorder.records.lock().unwrap();
    assert_eq!(records[0].target.as_deref(), Some("https://api.example.com"));
    assert_eq!(records[0].direction, PolicyDirection::Outbound);
}
