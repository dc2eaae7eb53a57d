// crates/aigos-core/src/golden_thread.rs
// ============================================================================
// Module: AIGOS Golden Thread
// Description: Deterministic approval hashing and approval freshness checks.
// Purpose: Prove who approved a deployment, when, and for which ticket.
// Dependencies: crate::{hashing, identity, time}, subtle
// ============================================================================

//! ## Overview
//! The golden thread canonical string is `ticket_id|approved_by|approved_at`
//! (exact order, pipe-delimited, literal values). Its hash is
//! `sha256:` followed by the lowercase hex SHA-256 of that string.
//! Invariants:
//! - [`compute`] is pure and deterministic.
//! - [`verify`] never fails; malformed input yields `verified = false` with a reason.
//! - Hash comparison is constant time.
//!
//! The approval grace period is a runtime policy layered on top of the hash:
//! an approval older than the grace period is expired even when the hash
//! matches, unless expired approvals are explicitly allowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::hashing::SHA256_PREFIX;
use crate::hashing::is_sha256_digest;
use crate::hashing::sha256_prefixed;
use crate::identity::GoldenThread;
use crate::identity::Identity;
use crate::time::Clock;
use crate::time::parse_rfc3339_millis;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default approval grace period in days.
pub const DEFAULT_GRACE_PERIOD_DAYS: u32 = 365;

/// Milliseconds per day.
const MILLIS_PER_DAY: i64 = 86_400_000;

// ============================================================================
// SECTION: Hash Computation
// ============================================================================

/// Computed golden thread hash with its canonical input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenThreadHash {
    /// Canonical pipe-delimited string that was hashed.
    pub canonical_string: String,
    /// Prefixed SHA-256 digest.
    pub hash: String,
}

/// Returns the canonical string for golden thread components.
#[must_use]
pub fn canonical_string(thread: &GoldenThread) -> String {
    format!("{}|{}|{}", thread.ticket_id, thread.approved_by, thread.approved_at)
}

/// Computes the golden thread hash for the provided components.
#[must_use]
pub fn compute(thread: &GoldenThread) -> GoldenThreadHash {
    let canonical_string = canonical_string(thread);
    let hash = sha256_prefixed(canonical_string.as_bytes());
    GoldenThreadHash {
        canonical_string,
        hash,
    }
}

// ============================================================================
// SECTION: Hash Verification
// ============================================================================

/// Reason a golden thread failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchReason {
    /// One or more components are empty.
    MissingFields,
    /// The expected hash is not a well-formed `sha256:` digest.
    InvalidHashFormat,
    /// The recomputed hash differs from the expected hash.
    HashMismatch,
}

impl MismatchReason {
    /// Returns the stable reason label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingFields => "missing_fields",
            Self::InvalidHashFormat => "invalid_hash_format",
            Self::HashMismatch => "hash_mismatch",
        }
    }
}

/// Golden thread verification result.
///
/// # Invariants
/// - `mismatch_reason` is `Some` exactly when `verified` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenThreadVerification {
    /// Whether the hash matched.
    pub verified: bool,
    /// Recomputed hash (absent when components are incomplete).
    pub computed: Option<String>,
    /// Hash the caller expected.
    pub expected: String,
    /// Failure reason when not verified.
    pub mismatch_reason: Option<MismatchReason>,
}

/// Recomputes the hash for `thread` and compares it with `expected`.
#[must_use]
pub fn verify(thread: &GoldenThread, expected: &str) -> GoldenThreadVerification {
    let fail = |computed: Option<String>, reason: MismatchReason| GoldenThreadVerification {
        verified: false,
        computed,
        expected: expected.to_string(),
        mismatch_reason: Some(reason),
    };
    if thread.ticket_id.trim().is_empty()
        || thread.approved_by.trim().is_empty()
        || thread.approved_at.trim().is_empty()
    {
        return fail(None, MismatchReason::MissingFields);
    }
    let computed = compute(thread).hash;
    // Hex digits compare case-insensitively; the prefix does not.
    let normalized = expected.strip_prefix(SHA256_PREFIX).map_or_else(
        || expected.to_string(),
        |hex| format!("{SHA256_PREFIX}{}", hex.to_ascii_lowercase()),
    );
    if !is_sha256_digest(&normalized) {
        return fail(Some(computed), MismatchReason::InvalidHashFormat);
    }
    let matches: bool = computed.as_bytes().ct_eq(normalized.as_bytes()).into();
    if !matches {
        return fail(Some(computed), MismatchReason::HashMismatch);
    }
    GoldenThreadVerification {
        verified: true,
        computed: Some(computed),
        expected: expected.to_string(),
        mismatch_reason: None,
    }
}

/// Verifies an identity's recorded golden thread hash against its components.
#[must_use]
pub fn verify_identity(identity: &Identity) -> GoldenThreadVerification {
    verify(&identity.golden_thread, &identity.golden_thread_hash)
}

// ============================================================================
// SECTION: Approval Freshness
// ============================================================================

/// Approval grace-period policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    /// Maximum approval age in days.
    pub grace_period_days: u32,
    /// Accept approvals older than the grace period.
    pub allow_expired: bool,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            grace_period_days: DEFAULT_GRACE_PERIOD_DAYS,
            allow_expired: false,
        }
    }
}

/// Result of an approval freshness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalFreshness {
    /// Whether the approval is acceptable under the policy.
    pub valid: bool,
    /// Whole days since approval (absent when the timestamp is unreadable).
    pub age_days: Option<i64>,
    /// Whether the approval is older than the grace period.
    pub expired: bool,
    /// Failure reason when not valid.
    pub reason: Option<String>,
}

/// Checks an approval timestamp against the grace-period policy.
#[must_use]
pub fn check_approval_freshness(
    thread: &GoldenThread,
    policy: ApprovalPolicy,
    now_unix_millis: i64,
) -> ApprovalFreshness {
    let Some(approved_at) = parse_rfc3339_millis(&thread.approved_at) else {
        return ApprovalFreshness {
            valid: false,
            age_days: None,
            expired: false,
            reason: Some("invalid_timestamp".to_string()),
        };
    };
    let age_millis = now_unix_millis.saturating_sub(approved_at);
    if age_millis < 0 {
        return ApprovalFreshness {
            valid: false,
            age_days: Some(0),
            expired: false,
            reason: Some("approval_in_future".to_string()),
        };
    }
    let age_days = age_millis / MILLIS_PER_DAY;
    let expired = age_millis > i64::from(policy.grace_period_days) * MILLIS_PER_DAY;
    if expired && !policy.allow_expired {
        return ApprovalFreshness {
            valid: false,
            age_days: Some(age_days),
            expired,
            reason: Some(format!(
                "approval_expired: {age_days} days old exceeds {} day grace period",
                policy.grace_period_days
            )),
        };
    }
    ApprovalFreshness {
        valid: true,
        age_days: Some(age_days),
        expired,
        reason: None,
    }
}

// ============================================================================
// SECTION: Runtime Verifier
// ============================================================================

/// Combined hash and freshness verdict for an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalVerification {
    /// Whether both the hash and the freshness checks passed.
    pub verified: bool,
    /// Hash verification detail.
    pub hash: GoldenThreadVerification,
    /// Freshness detail.
    pub freshness: ApprovalFreshness,
}

/// Runtime golden thread verifier bound to a clock and grace-period policy.
#[derive(Clone)]
pub struct GoldenThreadVerifier {
    /// Grace-period policy.
    policy: ApprovalPolicy,
    /// Time source for approval age.
    clock: Arc<dyn Clock>,
}

impl GoldenThreadVerifier {
    /// Creates a verifier with the provided policy and clock.
    #[must_use]
    pub fn new(policy: ApprovalPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
        }
    }

    /// Returns the configured policy.
    #[must_use]
    pub const fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    /// Verifies the identity's golden thread hash and approval age.
    #[must_use]
    pub fn verify_identity(&self, identity: &Identity) -> ApprovalVerification {
        let hash = verify_identity(identity);
        let freshness = check_approval_freshness(
            &identity.golden_thread,
            self.policy,
            self.clock.now_unix_millis(),
        );
        ApprovalVerification {
            verified: hash.verified && freshness.valid,
            hash,
            freshness,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
