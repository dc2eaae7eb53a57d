// crates/aigos-kill-switch/src/channel/supervisor.rs
// ============================================================================
// Module: Channel Supervisor
// Description: Connection management and exponential reconnect backoff.
// Purpose: Keep a channel listener connected without operator attention.
// Dependencies: tokio, tracing
// ============================================================================

//! ## Overview
//! [`ChannelSupervisor`] owns one listener. Each call to
//! [`ChannelSupervisor::next_step`] connects when needed, waits for commands,
//! and on failure schedules the Nth consecutive retry after
//! `base_delay × 2^(N-1)`. A successful connect resets the counter.
//! Invariants:
//! - After `max_attempts` retries fail, a non-recoverable `ChannelFailed`
//!   event is emitted exactly once and no further connection is attempted.
//! - Shutdown wins over every pending connect, read, or backoff sleep.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;
use tracing::warn;

use super::ChannelError;
use super::ChannelListener;
use crate::command::KillSwitchCommand;
use crate::events::EventSink;
use crate::events::LifecycleEvent;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Default first retry delay.
pub const DEFAULT_RECONNECT_BASE_DELAY: Duration = Duration::from_millis(1000);
/// Default retry budget.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Reconnect backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Retries allowed before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_RECONNECT_BASE_DELAY,
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Returns the delay before the given one-based retry, saturating.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay.checked_mul(factor).unwrap_or(Duration::MAX)
    }
}

// ============================================================================
// SECTION: Supervisor
// ============================================================================

/// Result of one supervisor step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorStep {
    /// Commands arrived.
    Commands(Vec<KillSwitchCommand>),
    /// Shutdown was requested; the listener is disconnected.
    Shutdown,
    /// Reconnect attempts are exhausted.
    Failed,
}

/// What woke a pending wait.
enum Wake<T> {
    /// Shutdown signal changed or its sender closed.
    Signal {
        /// Sender dropped.
        closed: bool,
    },
    /// Listener operation finished.
    Done(T),
}

/// Drives a channel listener with reconnect backoff.
pub struct ChannelSupervisor {
    /// Supervised listener.
    listener: Box<dyn ChannelListener>,
    /// Backoff policy.
    policy: ReconnectPolicy,
    /// Lifecycle event sink.
    events: Arc<dyn EventSink>,
    /// Consecutive failures since the last successful connect.
    failures: u32,
    /// Set once attempts are exhausted.
    failed: bool,
}

impl ChannelSupervisor {
    /// Creates a supervisor.
    #[must_use]
    pub fn new(
        listener: Box<dyn ChannelListener>,
        policy: ReconnectPolicy,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            listener,
            policy,
            events,
            failures: 0,
            failed: false,
        }
    }

    /// Returns consecutive failures since the last successful connect.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Returns true once reconnect attempts are exhausted.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.failed
    }

    /// Waits for the next batch of commands, reconnecting as needed.
    pub async fn next_step(&mut self, shutdown: &mut watch::Receiver<bool>) -> SupervisorStep {
        loop {
            if self.failed {
                return SupervisorStep::Failed;
            }
            if *shutdown.borrow() {
                self.close().await;
                return SupervisorStep::Shutdown;
            }
            if !self.listener.is_connected() {
                let wake = tokio::select! {
                    biased;
                    changed = shutdown.changed() => Wake::Signal { closed: changed.is_err() },
                    result = self.listener.connect() => Wake::Done(result),
                };
                match wake {
                    Wake::Signal {
                        closed,
                    } => {
                        if closed {
                            self.close().await;
                            return SupervisorStep::Shutdown;
                        }
                    }
                    Wake::Done(Ok(())) => {
                        self.failures = 0;
                        self.events.emit(&LifecycleEvent::ChannelConnected {
                            channel: self.listener.kind(),
                        });
                    }
                    Wake::Done(Err(err)) => {
                        if let Some(step) = self.on_failure(&err, shutdown).await {
                            return step;
                        }
                    }
                }
                continue;
            }
            let wake = tokio::select! {
                biased;
                changed = shutdown.changed() => Wake::Signal { closed: changed.is_err() },
                result = self.listener.next_commands() => Wake::Done(result),
            };
            match wake {
                Wake::Signal {
                    closed,
                } => {
                    if closed {
                        self.close().await;
                        return SupervisorStep::Shutdown;
                    }
                }
                Wake::Done(Ok(commands)) => return SupervisorStep::Commands(commands),
                Wake::Done(Err(err)) => {
                    self.listener.disconnect().await;
                    self.events.emit(&LifecycleEvent::ChannelDisconnected {
                        channel: self.listener.kind(),
                        reason: Some(err.to_string()),
                    });
                    if let Some(step) = self.on_failure(&err, shutdown).await {
                        return step;
                    }
                }
            }
        }
    }

    /// Disconnects the listener, reporting the disconnect when it was open.
    pub async fn close(&mut self) {
        if self.listener.is_connected() {
            self.listener.disconnect().await;
            self.events.emit(&LifecycleEvent::ChannelDisconnected {
                channel: self.listener.kind(),
                reason: None,
            });
        }
    }

    /// Records a failure and waits out the backoff delay.
    async fn on_failure(
        &mut self,
        err: &ChannelError,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<SupervisorStep> {
        self.failures = self.failures.saturating_add(1);
        let channel = self.listener.kind();
        if self.failures > self.policy.max_attempts {
            self.failed = true;
            warn!(
                %channel,
                attempts = self.policy.max_attempts,
                error = %err,
                "kill switch channel failed permanently"
            );
            self.events.emit(&LifecycleEvent::ChannelFailed {
                channel,
                attempts: self.policy.max_attempts,
                error: err.to_string(),
                recoverable: false,
            });
            return Some(SupervisorStep::Failed);
        }
        let attempt = self.failures;
        let delay = self.policy.delay_for(attempt);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        debug!(%channel, attempt, delay_ms, error = %err, "scheduling kill switch reconnect");
        self.events.emit(&LifecycleEvent::ChannelReconnecting {
            channel,
            attempt,
            delay_ms,
            error: err.to_string(),
        });
        let wake = tokio::select! {
            biased;
            changed = shutdown.changed() => Wake::Signal { closed: changed.is_err() },
            () = tokio::time::sleep(delay) => Wake::Done(()),
        };
        match wake {
            Wake::Signal {
                closed,
            } if closed || *shutdown.borrow() => Some(SupervisorStep::Shutdown),
            _ => None,
        }
    }
}
