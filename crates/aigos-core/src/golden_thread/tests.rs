// crates/aigos-core/src/golden_thread/tests.rs
// ============================================================================
// Module: Golden Thread Unit Tests
// Description: Tests for golden thread hashing and approval freshness.
// Purpose: Pin the canonical string format and the grace-period rules.
// Dependencies: aigos-core
// ============================================================================

//! ## Overview
//! Exercises canonical string construction, known hash vectors, malformed
//! input handling, and approval age policy.

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

use super::ApprovalPolicy;
use super::GoldenThreadVerifier;
use super::MismatchReason;
use super::canonical_string;
use super::check_approval_freshness;
use super::compute;
use super::verify;
use crate::identity::GoldenThread;
use crate::time::FixedClock;
use crate::time::parse_rfc3339_millis;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const KNOWN_HASH: &str = "sha256:1ff7d97a06623b68d91547e20c99920a4d60e19aa610a2b99afcc4ae63719904";

fn thread() -> GoldenThread {
    GoldenThread {
        ticket_id: "PROJ-1234".to_string(),
        approved_by: "jane.doe@example.com".to_string(),
        approved_at: "2026-01-15T10:30:00Z".to_string(),
    }
}

fn millis(value: &str) -> i64 {
    parse_rfc3339_millis(value).expect("timestamp")
}

// ============================================================================
// SECTION: Hash Tests
// ============================================================================

#[test]
fn canonical_string_is_pipe_delimited_in_field_order() {
    assert_eq!(canonical_string(&thread()), "PROJ-1234|jane.doe@example.com|2026-01-15T10:30:00Z");
}

#[test]
fn compute_matches_known_vector() {
    let computed = compute(&thread());
    assert_eq!(computed.hash, KNOWN_HASH);
    assert_eq!(computed.canonical_string, canonical_string(&thread()));
}

#[test]
fn verify_accepts_matching_hash() {
    let result = verify(&thread(), KNOWN_HASH);
    assert!(result.verified);
    assert_eq!(result.computed.as_deref(), Some(KNOWN_HASH));
    assert_eq!(result.mismatch_reason, None);
}

#[test]
fn verify_reports_mismatch_for_other_ticket() {
    let mut other = thread();
    other.ticket_id = "PROJ-1235".to_string();
    let result = verify(&other, KNOWN_HASH);
    assert!(!result.verified);
    assert_eq!(result.mismatch_reason, Some(MismatchReason::HashMismatch));
}

#[test]
fn verify_accepts_uppercase_hex_digits() {
    let upper = format!("sha256:{}", KNOWN_HASH.trim_start_matches("sha256:").to_uppercase());
    let result = verify(&thread(), &upper);
    assert!(result.verified, "{result:?}");
    assert_eq!(result.expected, upper);
}

#[test]
fn verify_reports_mismatch_for_tampered_uppercase_digit() {
    let mut tampered = KNOWN_HASH.to_string();
    tampered.pop();
    tampered.push('F');
    let result = verify(&thread(), &tampered);
    assert!(!result.verified);
    assert_eq!(result.mismatch_reason, Some(MismatchReason::HashMismatch));
}

#[test]
fn verify_reports_missing_fields() {
    let mut incomplete = thread();
    incomplete.approved_by = "  ".to_string();
    let result = verify(&incomplete, KNOWN_HASH);
    assert!(!result.verified);
    assert_eq!(result.computed, None);
    assert_eq!(result.mismatch_reason, Some(MismatchReason::MissingFields));
}

#[test]
fn verify_reports_invalid_hash_format() {
    let candidates = vec![
        String::new(),
        "sha256:".to_string(),
        "md5:abc".to_string(),
        KNOWN_HASH.to_uppercase(),
        KNOWN_HASH.trim_start_matches("sha256:").to_string(),
    ];
    for expected in &candidates {
        let result = verify(&thread(), expected);
        assert!(!result.verified, "accepted {expected}");
        assert_eq!(result.mismatch_reason, Some(MismatchReason::InvalidHashFormat));
    }
}

// ============================================================================
// SECTION: Freshness Tests
// ============================================================================

#[test]
fn fresh_approval_is_valid() {
    let now = millis("2026-03-01T00:00:00Z");
    let freshness = check_approval_freshness(&thread(), ApprovalPolicy::default(), now);
    assert!(freshness.valid);
    assert!(!freshness.expired);
    assert_eq!(freshness.age_days, Some(44));
}

#[test]
fn stale_approval_is_expired_by_default() {
    let now = millis("2027-03-01T00:00:00Z");
    let freshness = check_approval_freshness(&thread(), ApprovalPolicy::default(), now);
    assert!(!freshness.valid);
    assert!(freshness.expired);
    assert!(freshness.reason.unwrap().starts_with("approval_expired"));
}

#[test]
fn stale_approval_is_accepted_when_expired_allowed() {
    let now = millis("2027-03-01T00:00:00Z");
    let policy = ApprovalPolicy {
        allow_expired: true,
        ..ApprovalPolicy::default()
    };
    let freshness = check_approval_freshness(&thread(), policy, now);
    assert!(freshness.valid);
    assert!(freshness.expired);
}

#[test]
fn unreadable_approval_timestamp_is_invalid() {
    let mut broken = thread();
    broken.approved_at = "yesterday".to_string();
    let freshness = check_approval_freshness(&broken, ApprovalPolicy::default(), 0);
    assert!(!freshness.valid);
    assert_eq!(freshness.reason.as_deref(), Some("invalid_timestamp"));
}

#[test]
fn verifier_combines_hash_and_freshness() {
    let clock = Arc::new(FixedClock::new(millis("2026-02-01T00:00:00Z")));
    let verifier = GoldenThreadVerifier::new(ApprovalPolicy::default(), clock.clone());
    let identity = crate::identity::Identity {
        instance_id: "6f0c2d4e-2d8a-4a43-9b1f-3f9a8f1d0c11".to_string(),
        asset_id: "aigrc-2026-a1b2c3d4".to_string(),
        asset_name: "invoice-agent".to_string(),
        asset_version: "1.0.0".to_string(),
        risk_level: crate::identity::RiskLevel::Limited,
        golden_thread_hash: KNOWN_HASH.to_string(),
        golden_thread: thread(),
        lineage: crate::identity::Lineage::root("6f0c2d4e-2d8a-4a43-9b1f-3f9a8f1d0c11"),
        capabilities_manifest: crate::identity::CapabilitiesManifest::default(),
        mode: crate::identity::OperatingMode::Normal,
        verified: true,
    };
    assert!(verifier.verify_identity(&identity).verified);

    clock.set(millis("2027-06-01T00:00:00Z"));
    let verdict = verifier.verify_identity(&identity);
    assert!(verdict.hash.verified);
    assert!(!verdict.verified);
}
