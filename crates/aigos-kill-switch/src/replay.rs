// crates/aigos-kill-switch/src/replay.rs
// ============================================================================
// Module: Kill Switch Replay Guard
// Description: Bounded nonce cache with a timestamp window.
// Purpose: Ensure each command is consumed at most once per receiving instance.
// Dependencies: serde, aigos-core
// ============================================================================

//! ## Overview
//! The guard remembers processed command identifiers, evicting the oldest
//! entry once the capacity is reached. A command is accepted only when its
//! identifier is unseen and its timestamp is inside the age window and not in
//! the future. Nonces are committed by [`ReplayGuard::mark_processed`] only
//! after the command executed successfully.
//! Invariants:
//! - `len() <= capacity()` at all times.
//! - Eviction is oldest-first by commit order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use aigos_core::Clock;
use aigos_core::time::parse_rfc3339_millis;
use serde::Deserialize;
use serde::Serialize;

use crate::command::KillSwitchCommand;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default nonce cache capacity.
pub const DEFAULT_NONCE_CACHE_SIZE: usize = 100;

// ============================================================================
// SECTION: Results
// ============================================================================

/// Replay check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCheck {
    /// Whether the command may be executed.
    pub valid: bool,
    /// Whether the command identifier was already processed.
    pub is_replay: bool,
    /// Rejection reason.
    pub reason: Option<String>,
}

impl ReplayCheck {
    /// Builds a rejection.
    fn reject(is_replay: bool, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            is_replay,
            reason: Some(reason.into()),
        }
    }
}

/// Processed nonce entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceEntry {
    /// Command identifier.
    pub command_id: String,
    /// Commit time in unix milliseconds.
    pub processed_at_ms: i64,
}

/// Serializable nonce cache contents, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceSnapshot {
    /// Entries in commit order.
    pub entries: Vec<NonceEntry>,
}

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Replay prevention guard.
pub struct ReplayGuard {
    /// Maximum number of remembered nonces.
    capacity: usize,
    /// Maximum command age in seconds.
    max_age_seconds: i64,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Command identifier to commit time.
    processed: HashMap<String, i64>,
    /// Commit order for eviction.
    order: VecDeque<String>,
}

impl ReplayGuard {
    /// Creates a guard. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize, max_age_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            max_age_seconds,
            clock,
            processed: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Returns the capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of remembered nonces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true when no nonces are remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns true when the identifier was processed.
    #[must_use]
    pub fn contains(&self, command_id: &str) -> bool {
        self.processed.contains_key(command_id)
    }

    /// Forgets every nonce.
    pub fn clear(&mut self) {
        self.processed.clear();
        self.order.clear();
    }

    /// Checks a command for replay and timestamp freshness.
    #[must_use]
    pub fn check_command(&self, command: &KillSwitchCommand) -> ReplayCheck {
        if self.contains(&command.command_id) {
            return ReplayCheck::reject(
                true,
                format!("command {} was already processed", command.command_id),
            );
        }
        let Some(issued_at) = parse_rfc3339_millis(&command.timestamp) else {
            return ReplayCheck::reject(false, "unreadable command timestamp");
        };
        let delta = self.clock.now_unix_millis().saturating_sub(issued_at);
        if delta < 0 {
            return ReplayCheck::reject(false, "command timestamp is in the future");
        }
        if delta > self.max_age_seconds.saturating_mul(1000) {
            return ReplayCheck::reject(
                false,
                format!("command is older than {}s", self.max_age_seconds),
            );
        }
        ReplayCheck {
            valid: true,
            is_replay: false,
            reason: None,
        }
    }

    /// Commits a command's nonce after successful execution.
    pub fn mark_processed(&mut self, command: &KillSwitchCommand) {
        let now = self.clock.now_unix_millis();
        self.insert(command.command_id.clone(), now);
    }

    /// Exports remembered nonces, oldest first.
    #[must_use]
    pub fn export_nonces(&self) -> NonceSnapshot {
        let entries = self
            .order
            .iter()
            .filter_map(|command_id| {
                self.processed.get(command_id).map(|processed_at_ms| NonceEntry {
                    command_id: command_id.clone(),
                    processed_at_ms: *processed_at_ms,
                })
            })
            .collect();
        NonceSnapshot {
            entries,
        }
    }

    /// Imports nonces, applying the same eviction as live commits.
    pub fn import_nonces(&mut self, snapshot: NonceSnapshot) {
        for entry in snapshot.entries {
            self.insert(entry.command_id, entry.processed_at_ms);
        }
    }

    /// Inserts a nonce, evicting the oldest entry when full.
    fn insert(&mut self, command_id: String, processed_at_ms: i64) {
        if self.processed.contains_key(&command_id) {
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.processed.remove(&oldest);
            }
        }
        self.processed.insert(command_id.clone(), processed_at_ms);
        self.order.push_back(command_id);
    }
}
