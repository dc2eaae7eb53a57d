// crates/aigos-core/tests/proptest_golden_thread.rs
// ============================================================================
// Module: Golden Thread Property-Based Tests
// Description: Property tests for golden thread determinism and tamper detection.
// Purpose: Detect nondeterminism and false positives across wide input ranges.
// ============================================================================

//! Property-based tests for golden thread invariants.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use aigos_core::GoldenThread;
use aigos_core::MismatchReason;
use aigos_core::golden_thread::compute;
use aigos_core::golden_thread::verify;
use aigos_core::hashing::is_sha256_digest;
use proptest::prelude::*;

fn thread_strategy() -> impl Strategy<Value = GoldenThread> {
    (
        "[A-Z]{2,6}-[0-9]{1,5}",
        "[a-z.]{1,12}@[a-z]{1,8}\\.com",
        "20[0-9]{2}-0[1-9]-1[0-9]T0[0-9]:00:00Z",
    )
        .prop_map(|(ticket_id, approved_by, approved_at)| GoldenThread {
            ticket_id,
            approved_by,
            approved_at,
        })
}

proptest! {
    #[test]
    fn compute_is_deterministic(thread in thread_strategy()) {
        let first = compute(&thread);
        let second = compute(&thread);
        prop_assert_eq!(&first, &second);
        prop_assert!(is_sha256_digest(&first.hash));
        prop_assert!(verify(&thread, &first.hash).verified);
    }

    #[test]
    fn single_digit_change_is_detected(thread in thread_strategy(), position in 0usize .. 64) {
        let hash = compute(&thread).hash;
        let mut digits: Vec<char> = hash.trim_start_matches("sha256:").chars().collect();
        digits[position] = if digits[position] == '0' { '1' } else { '0' };
        let tampered = format!("sha256:{}", digits.into_iter().collect::<String>());
        let result = verify(&thread, &tampered);
        prop_assert!(!result.verified);
        prop_assert_eq!(result.mismatch_reason, Some(MismatchReason::HashMismatch));
    }
}
