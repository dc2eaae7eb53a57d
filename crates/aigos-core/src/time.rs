// crates/aigos-core/src/time.rs
// ============================================================================
// Module: AIGOS Time Model
// Description: Clock abstraction and RFC 3339 timestamp helpers.
// Purpose: Keep temporal checks deterministic and replayable under test.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Token lifetimes, command ages, and approval grace periods are all computed
//! against a [`Clock`] supplied by the host. [`SystemClock`] reads wall-clock
//! time; [`FixedClock`] is a settable clock for tests and replay.
//! Wire timestamps are RFC 3339 strings; internal arithmetic uses unix
//! milliseconds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time as unix epoch milliseconds.
    fn now_unix_millis(&self) -> i64;

    /// Returns the current time as unix epoch seconds.
    fn now_unix_seconds(&self) -> i64 {
        self.now_unix_millis().div_euclid(1_000)
    }
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
    }
}

/// Settable time source.
///
/// # Invariants
/// - Time only moves when [`FixedClock::set`] or [`FixedClock::advance_millis`] is called.
#[derive(Debug, Default)]
pub struct FixedClock {
    /// Current unix epoch milliseconds.
    millis: AtomicI64,
}

impl FixedClock {
    /// Creates a clock pinned at the provided unix milliseconds.
    #[must_use]
    pub const fn new(unix_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(unix_millis),
        }
    }

    /// Pins the clock to a new instant.
    pub fn set(&self, unix_millis: i64) {
        self.millis.store(unix_millis, Ordering::SeqCst);
    }

    /// Moves the clock forward (or backward for negative values).
    pub fn advance_millis(&self, delta: i64) {
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: RFC 3339 Helpers
// ============================================================================

/// Parses an RFC 3339 timestamp into unix epoch milliseconds.
///
/// Returns `None` for malformed or out-of-range timestamps.
#[must_use]
pub fn parse_rfc3339_millis(value: &str) -> Option<i64> {
    let parsed = OffsetDateTime::parse(value.trim(), &Rfc3339).ok()?;
    i64::try_from(parsed.unix_timestamp_nanos() / 1_000_000).ok()
}

/// Formats unix epoch milliseconds as an RFC 3339 timestamp.
///
/// Returns `None` when the instant cannot be represented.
#[must_use]
pub fn format_rfc3339_millis(unix_millis: i64) -> Option<String> {
    let nanos = i128::from(unix_millis) * 1_000_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?.format(&Rfc3339).ok()
}
