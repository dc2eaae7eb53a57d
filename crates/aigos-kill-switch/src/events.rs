// crates/aigos-kill-switch/src/events.rs
// ============================================================================
// Module: Kill Switch Lifecycle Events
// Description: Typed receiver events and reference event sinks.
// Purpose: Surface command and channel outcomes to unattended observers.
// Dependencies: aigos-core, serde, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! The receiver runs unattended, so channel errors and command failures are
//! reported as [`LifecycleEvent`] values rather than returned errors. Events
//! are delivered to an [`EventSink`] synchronously, in emission order.
//! Invariants:
//! - Sinks never block the receiver; a full channel drops the event with a
//!   warning.
//! - `VerificationSkipped` is emitted for every command accepted without a
//!   signature check.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use aigos_core::ControlChannel;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::command::AgentState;
use crate::command::CommandType;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Receiver lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A command arrived on a channel.
    CommandReceived {
        /// Command identifier.
        command_id: String,
        /// Command kind.
        command_type: CommandType,
    },
    /// A command addressed another instance.
    CommandIgnored {
        /// Command identifier.
        command_id: String,
        /// Why the command was ignored.
        reason: String,
    },
    /// A command failed verification or the replay check.
    CommandRejected {
        /// Command identifier.
        command_id: String,
        /// Rejection reason.
        reason: String,
        /// Whether the rejection was a replay.
        replay: bool,
    },
    /// A verified command failed to execute.
    CommandFailed {
        /// Command identifier.
        command_id: String,
        /// Command kind.
        command_type: CommandType,
        /// Failure detail.
        error: String,
    },
    /// A command was executed.
    StateChanged {
        /// Command identifier.
        command_id: String,
        /// State before the command.
        previous: AgentState,
        /// State after the command.
        current: AgentState,
    },
    /// A command was accepted with signature verification disabled.
    VerificationSkipped {
        /// Command identifier.
        command_id: String,
    },
    /// A channel connected.
    ChannelConnected {
        /// Channel kind.
        channel: ControlChannel,
    },
    /// A channel disconnected.
    ChannelDisconnected {
        /// Channel kind.
        channel: ControlChannel,
        /// Disconnect cause, when not requested locally.
        reason: Option<String>,
    },
    /// A reconnect attempt was scheduled.
    ChannelReconnecting {
        /// Channel kind.
        channel: ControlChannel,
        /// One-based attempt number.
        attempt: u32,
        /// Delay before the attempt.
        delay_ms: u64,
        /// Error that triggered the reconnect.
        error: String,
    },
    /// Reconnect attempts are exhausted.
    ChannelFailed {
        /// Channel kind.
        channel: ControlChannel,
        /// Attempts made.
        attempts: u32,
        /// Last error.
        error: String,
        /// Whether automatic recovery will continue.
        recoverable: bool,
    },
}

impl LifecycleEvent {
    /// Returns the stable event label.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CommandReceived {
                ..
            } => "command_received",
            Self::CommandIgnored {
                ..
            } => "command_ignored",
            Self::CommandRejected {
                ..
            } => "command_rejected",
            Self::CommandFailed {
                ..
            } => "command_failed",
            Self::StateChanged {
                ..
            } => "state_changed",
            Self::VerificationSkipped {
                ..
            } => "verification_skipped",
            Self::ChannelConnected {
                ..
            } => "channel_connected",
            Self::ChannelDisconnected {
                ..
            } => "channel_disconnected",
            Self::ChannelReconnecting {
                ..
            } => "channel_reconnecting",
            Self::ChannelFailed {
                ..
            } => "channel_failed",
        }
    }
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Receives lifecycle events in emission order.
pub trait EventSink: Send + Sync {
    /// Handles one event. Implementations must not block.
    fn emit(&self, event: &LifecycleEvent);
}

// ============================================================================
// SECTION: Implementations
// ============================================================================

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &LifecycleEvent) {}
}

/// Forwards events to a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    /// Event sender.
    sender: mpsc::Sender<LifecycleEvent>,
}

impl ChannelEventSink {
    /// Creates a sink over an existing sender.
    #[must_use]
    pub const fn new(sender: mpsc::Sender<LifecycleEvent>) -> Self {
        Self {
            sender,
        }
    }

    /// Creates a sink and its receiving half.
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<LifecycleEvent>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self::new(sender), receiver)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: &LifecycleEvent) {
        match self.sender.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(event = dropped.name(), "lifecycle event channel full; event dropped");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Writes one JSON record per event to a writer.
pub struct LogEventSink<W: Write + Send> {
    /// Output writer.
    writer: Mutex<W>,
    /// Monotonic record sequence.
    seq: AtomicU64,
}

/// JSON record written by [`LogEventSink`].
#[derive(Serialize)]
struct LogRecord<'a> {
    /// One-based sequence number.
    seq: u64,
    /// Event payload.
    #[serde(flatten)]
    event: &'a LifecycleEvent,
}

impl<W: Write + Send> LogEventSink<W> {
    /// Creates a log sink over the writer.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            seq: AtomicU64::new(0),
        }
    }

    /// Writes one record.
    fn write_record(&self, event: &LifecycleEvent) -> Result<(), String> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let mut line = serde_json::to_vec(&LogRecord {
            seq,
            event,
        })
        .map_err(|err| err.to_string())?;
        line.push(b'\n');
        let mut writer = self.writer.lock().map_err(|_| "log writer lock poisoned".to_string())?;
        writer.write_all(&line).map_err(|err| err.to_string())?;
        writer.flush().map_err(|err| err.to_string())
    }
}

impl<W: Write + Send> EventSink for LogEventSink<W> {
    fn emit(&self, event: &LifecycleEvent) {
        if let Err(err) = self.write_record(event) {
            warn!(event = event.name(), error = %err, "lifecycle event log write failed");
        }
    }
}

/// Invokes a closure for each event.
pub struct CallbackEventSink<F> {
    /// Event callback.
    callback: F,
}

impl<F> CallbackEventSink<F>
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    /// Creates a callback sink.
    #[must_use]
    pub const fn new(callback: F) -> Self {
        Self {
            callback,
        }
    }
}

impl<F> EventSink for CallbackEventSink<F>
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn emit(&self, event: &LifecycleEvent) {
        (self.callback)(event);
    }
}

/// Fans events out to several sinks in registration order.
#[derive(Clone, Default)]
pub struct EventBus {
    /// Registered sinks.
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the number of sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true when no sinks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: &LifecycleEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
