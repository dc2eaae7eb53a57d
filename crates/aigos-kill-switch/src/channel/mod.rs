// crates/aigos-kill-switch/src/channel/mod.rs
// ============================================================================
// Module: Kill Switch Channels
// Description: Channel listener contract and shared decoding helpers.
// Purpose: Deliver operator commands over push-stream, polling, or file transports.
// Dependencies: aigos-core, async-trait, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Every transport implements [`ChannelListener`]: `connect`, `disconnect`,
//! `is_connected`, and `next_commands`, which waits for the next batch of
//! decoded commands. Connection and transport errors are returned to the
//! [`ChannelSupervisor`], which applies reconnect backoff and reports through
//! lifecycle events.
//! Invariants:
//! - Channel payloads are capped at [`MAX_CHANNEL_PAYLOAD_BYTES`].
//! - A malformed individual command is skipped with a warning; it never
//!   terminates the channel.
//!
//! Security posture: channel payloads are untrusted; commands are verified
//! by the receiver before any state change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use aigos_core::ControlChannel;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::command::KillSwitchCommand;

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod file;
pub mod polling;
pub mod sse;
pub mod supervisor;

pub use file::FileChannel;
pub use file::FileChannelConfig;
pub use polling::PollingChannel;
pub use polling::PollingChannelConfig;
pub use sse::SseChannel;
pub use sse::SseChannelConfig;
pub use supervisor::ChannelSupervisor;
pub use supervisor::ReconnectPolicy;
pub use supervisor::SupervisorStep;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum payload size accepted from any channel.
pub const MAX_CHANNEL_PAYLOAD_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Channel listener errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Connection could not be established.
    #[error("channel connect failed: {0}")]
    Connect(String),
    /// Transport failed after connecting.
    #[error("channel transport failed: {0}")]
    Transport(String),
    /// Remote end closed the stream.
    #[error("channel closed by remote")]
    Closed,
    /// Payload could not be decoded.
    #[error("channel payload decode failed: {0}")]
    Decode(String),
    /// Payload exceeds the size cap.
    #[error("channel payload exceeds {max_bytes} bytes")]
    PayloadTooLarge {
        /// Maximum accepted bytes.
        max_bytes: usize,
    },
    /// Channel type or endpoint is not supported.
    #[error("unsupported channel: {0}")]
    Unsupported(String),
    /// Operation timed out.
    #[error("channel operation timed out")]
    Timeout,
    /// Operation requires a connected channel.
    #[error("channel is not connected")]
    NotConnected,
}

// ============================================================================
// SECTION: Listener Contract
// ============================================================================

/// Uniform command transport.
#[async_trait]
pub trait ChannelListener: Send {
    /// Returns the transport kind.
    fn kind(&self) -> ControlChannel;

    /// Establishes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the transport is unreachable.
    async fn connect(&mut self) -> Result<(), ChannelError>;

    /// Waits for the next batch of commands.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the transport fails or closes.
    async fn next_commands(&mut self) -> Result<Vec<KillSwitchCommand>, ChannelError>;

    /// Closes the connection. Idempotent.
    async fn disconnect(&mut self);

    /// Returns true while connected.
    fn is_connected(&self) -> bool;
}

// ============================================================================
// SECTION: Decoding Helpers
// ============================================================================

/// Rejects payloads over the channel cap.
pub(crate) const fn enforce_payload_size(len: usize) -> Result<(), ChannelError> {
    if len > MAX_CHANNEL_PAYLOAD_BYTES {
        return Err(ChannelError::PayloadTooLarge {
            max_bytes: MAX_CHANNEL_PAYLOAD_BYTES,
        });
    }
    Ok(())
}

/// Decodes a JSON array of commands or a single command object.
///
/// # Errors
///
/// Returns [`ChannelError::Decode`] when the payload is not JSON or is neither
/// an array nor an object.
pub(crate) fn decode_command_batch(bytes: &[u8]) -> Result<Vec<KillSwitchCommand>, ChannelError> {
    enforce_payload_size(bytes.len())?;
    let value: Value =
        serde_json::from_slice(bytes).map_err(|err| ChannelError::Decode(err.to_string()))?;
    match value {
        Value::Array(items) => Ok(decode_command_values(items)),
        Value::Object(_) => Ok(decode_command_values(vec![value])),
        _ => Err(ChannelError::Decode("expected a command object or array".to_string())),
    }
}

/// Decodes command values, skipping malformed entries.
pub(crate) fn decode_command_values(values: Vec<Value>) -> Vec<KillSwitchCommand> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<KillSwitchCommand>(value) {
            Ok(command) => Some(command),
            Err(err) => {
                warn!(error = %err, "skipping malformed kill switch command");
                None
            }
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
