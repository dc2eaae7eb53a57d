// crates/aigos-kill-switch/tests/common/mod.rs
// ============================================================================
// Module: Kill Switch Test Helpers
// Description: Shared fixtures for kill switch integration tests.
// Purpose: Build signed commands, recording handlers, and recording sinks.
// Dependencies: aigos-core, aigos-kill-switch, ed25519-dalek, base64
// ============================================================================

//! Shared helpers for kill switch integration tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use aigos_core::FixedClock;
use aigos_kill_switch::CommandType;
use aigos_kill_switch::ControlHandler;
use aigos_kill_switch::EventSink;
use aigos_kill_switch::HandlerError;
use aigos_kill_switch::KillSwitchCommand;
use aigos_kill_switch::KillSwitchReceiver;
use aigos_kill_switch::LifecycleEvent;
use aigos_kill_switch::PublicKey;
use aigos_kill_switch::ReceiverConfig;
use aigos_kill_switch::SignatureVerifier;
use aigos_kill_switch::TrustedKey;
use aigos_kill_switch::canonical_command_string;
use aigos_kill_switch::signature::DEFAULT_MAX_COMMAND_AGE_SECONDS;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// 2026-03-01T12:00:10Z.
pub const NOW_MILLIS: i64 = 1_772_366_410_000;
/// Ten seconds before [`NOW_MILLIS`].
pub const ISSUED_AT: &str = "2026-03-01T12:00:00Z";
/// Operator key identifier.
pub const OPERATOR_KEY_ID: &str = "ops-2026";

/// Returns a clock pinned at [`NOW_MILLIS`].
pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(NOW_MILLIS))
}

/// Returns the operator signing key.
pub fn operator_key() -> SigningKey {
    SigningKey::from_bytes(&[11u8; 32])
}

/// Returns the operator key as a trusted key.
pub fn operator_trusted_key() -> TrustedKey {
    TrustedKey::new(OPERATOR_KEY_ID, PublicKey::Ed25519(operator_key().verifying_key()))
}

/// Returns a verifier trusting the operator key.
pub fn verifier(clock: Arc<FixedClock>) -> SignatureVerifier {
    SignatureVerifier::new(vec![operator_trusted_key()], DEFAULT_MAX_COMMAND_AGE_SECONDS, clock)
}

/// Builds an unsigned command issued at [`ISSUED_AT`].
pub fn unsigned(command_id: &str, command_type: CommandType) -> KillSwitchCommand {
    KillSwitchCommand {
        command_id: command_id.to_string(),
        command_type,
        signature: String::new(),
        timestamp: ISSUED_AT.to_string(),
        reason: "operator request".to_string(),
        issued_by: "ops@example.com".to_string(),
        instance_id: None,
        asset_id: None,
        organization: None,
    }
}

/// Signs a command with the given Ed25519 key.
pub fn sign_with(
    mut command: KillSwitchCommand,
    key: &SigningKey,
    key_id: Option<&str>,
) -> KillSwitchCommand {
    let signature = key.sign(canonical_command_string(&command).as_bytes());
    let encoded = STANDARD.encode(signature.to_bytes());
    command.signature = match key_id {
        Some(key_id) => format!("Ed25519:{encoded}:{key_id}"),
        None => format!("Ed25519:{encoded}"),
    };
    command
}

/// Builds a command signed by the operator key.
pub fn signed(command_id: &str, command_type: CommandType) -> KillSwitchCommand {
    sign_with(unsigned(command_id, command_type), &operator_key(), Some(OPERATOR_KEY_ID))
}

// ============================================================================
// SECTION: Recording Handler
// ============================================================================

/// Control handler that records invocations.
#[derive(Default)]
pub struct RecordingHandler {
    /// Invoked command kinds in order.
    calls: Mutex<Vec<CommandType>>,
    /// Command kind that fails.
    fail_on: Mutex<Option<CommandType>>,
    /// Delay applied before each effect.
    delay: Option<Duration>,
}

impl RecordingHandler {
    /// Creates a handler that delays every effect.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Makes the given command kind fail until cleared.
    pub fn fail_on(&self, command_type: Option<CommandType>) {
        *self.fail_on.lock().unwrap() = command_type;
    }

    /// Returns recorded invocations.
    pub fn calls(&self) -> Vec<CommandType> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, command_type: CommandType) -> Result<(), HandlerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_on.lock().unwrap() == Some(command_type) {
            return Err(HandlerError::new(format!("{command_type} callback failed")));
        }
        self.calls.lock().unwrap().push(command_type);
        Ok(())
    }
}

#[async_trait]
impl ControlHandler for RecordingHandler {
    async fn terminate(&self, _command: &KillSwitchCommand) -> Result<(), HandlerError> {
        self.record(CommandType::Terminate).await
    }

    async fn pause(&self, _command: &KillSwitchCommand) -> Result<(), HandlerError> {
        self.record(CommandType::Pause).await
    }

    async fn resume(&self, _command: &KillSwitchCommand) -> Result<(), HandlerError> {
        self.record(CommandType::Resume).await
    }
}

// ============================================================================
// SECTION: Recording Sink
// ============================================================================

/// Event sink that stores every event.
#[derive(Default)]
pub struct RecordingSink {
    /// Events in emission order.
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    /// Returns recorded events.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns recorded event names.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(LifecycleEvent::name).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &LifecycleEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Receiver Builder
// ============================================================================

/// Receiver plus its recording collaborators.
pub struct Harness {
    /// Receiver under test.
    pub receiver: KillSwitchReceiver,
    /// Recording handler.
    pub handler: Arc<RecordingHandler>,
    /// Recording sink.
    pub sink: Arc<RecordingSink>,
}

/// Builds a receiver with the given configuration and handler.
pub fn harness_with(config: ReceiverConfig, handler: RecordingHandler) -> Harness {
    let clock = clock();
    let handler = Arc::new(handler);
    let sink = Arc::new(RecordingSink::default());
    let receiver = KillSwitchReceiver::new(
        config,
        verifier(Arc::clone(&clock)),
        Arc::clone(&handler) as Arc<dyn ControlHandler>,
        Arc::clone(&sink) as Arc<dyn EventSink>,
        clock,
    )
    .expect("receiver");
    Harness {
        receiver,
        handler,
        sink,
    }
}

/// Builds a receiver with default configuration.
pub fn harness() -> Harness {
    harness_with(ReceiverConfig::default(), RecordingHandler::default())
}
