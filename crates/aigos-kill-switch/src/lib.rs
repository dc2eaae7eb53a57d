// crates/aigos-kill-switch/src/lib.rs
// ============================================================================
// Module: AIGOS Kill Switch Library
// Description: Public API surface for the operator kill switch.
// Purpose: Expose command verification, replay prevention, channels, and the receiver.
// Dependencies: crate::{command, signature, replay, events, channel, receiver}
// ============================================================================

//! ## Overview
//! The kill switch lets an operator pause, resume, or terminate a running
//! agent over a push-stream, polling, or file channel. Commands are signed,
//! checked against a bounded nonce cache, and executed by a
//! [`KillSwitchReceiver`] that owns the agent's lifecycle state.
//! Invariants:
//! - Command and channel failures surface as [`LifecycleEvent`] values, never
//!   as errors from the running receiver.
//! - Misconfiguration (no trusted keys while signatures are required) fails
//!   at construction.
//!
//! Security posture: channel payloads are untrusted until the signature
//! verifier and replay guard accept them.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod channel;
pub mod command;
pub mod events;
pub mod receiver;
pub mod replay;
pub mod signature;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use channel::ChannelError;
pub use channel::ChannelListener;
pub use channel::ChannelSupervisor;
pub use channel::FileChannel;
pub use channel::FileChannelConfig;
pub use channel::PollingChannel;
pub use channel::PollingChannelConfig;
pub use channel::ReconnectPolicy;
pub use channel::SseChannel;
pub use channel::SseChannelConfig;
pub use channel::SupervisorStep;
pub use command::AgentState;
pub use command::CommandType;
pub use command::KillSwitchCommand;
pub use command::ReceiverIdentity;
pub use events::CallbackEventSink;
pub use events::ChannelEventSink;
pub use events::EventBus;
pub use events::EventSink;
pub use events::LifecycleEvent;
pub use events::LogEventSink;
pub use events::NoopEventSink;
pub use receiver::CommandOutcome;
pub use receiver::ControlHandler;
pub use receiver::HandlerError;
pub use receiver::KillSwitchReceiver;
pub use receiver::ReceiverConfig;
pub use receiver::ReceiverError;
pub use receiver::ReceiverHandle;
pub use replay::NonceEntry;
pub use replay::NonceSnapshot;
pub use replay::ReplayCheck;
pub use replay::ReplayGuard;
pub use signature::KeyError;
pub use signature::PublicKey;
pub use signature::SignatureAlgorithm;
pub use signature::SignatureCheck;
pub use signature::SignatureEnvelope;
pub use signature::SignatureFailure;
pub use signature::SignatureVerifier;
pub use signature::TrustedKey;
pub use signature::canonical_command_string;
