// crates/aigos-kill-switch/tests/receiver.rs
// ============================================================================
// Module: Kill Switch Receiver Tests
// Description: Integration tests for the command pipeline and state machine.
// Purpose: Validate idempotence, absorption, targeting, timeouts, and events.
// Dependencies: aigos-kill-switch, tokio
// ============================================================================

//! ## Overview
//! Drives [`aigos_kill_switch::KillSwitchReceiver::handle_command`] directly
//! with signed commands and a recording handler.

#![allow(dead_code, reason = "Shared helpers are not used by every test crate.")]
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

mod common;

use std::sync::Arc;
use std::time::Duration;

use aigos_core::Clock;
use aigos_kill_switch::AgentState;
use aigos_kill_switch::CommandType;
use aigos_kill_switch::ControlHandler;
use aigos_kill_switch::KillSwitchReceiver;
use aigos_kill_switch::LifecycleEvent;
use aigos_kill_switch::NoopEventSink;
use aigos_kill_switch::ReceiverConfig;
use aigos_kill_switch::ReceiverError;
use aigos_kill_switch::ReceiverIdentity;
use aigos_kill_switch::SignatureVerifier;

use common::RecordingHandler;
use common::clock;
use common::harness;
use common::harness_with;
use common::signed;
use common::unsigned;

// ============================================================================
// SECTION: Construction
// ============================================================================

#[test]
fn requiring_signatures_without_keys_fails_fast() {
    let clock = clock();
    let result = KillSwitchReceiver::new(
        ReceiverConfig::default(),
        SignatureVerifier::new(Vec::new(), 300, Arc::clone(&clock) as Arc<dyn Clock>),
        Arc::new(RecordingHandler::default()) as Arc<dyn ControlHandler>,
        Arc::new(NoopEventSink),
        clock,
    );
    assert!(matches!(result, Err(ReceiverError::NoTrustedKeys)));
}

// ============================================================================
// SECTION: State Machine
// ============================================================================

#[tokio::test]
async fn pause_and_resume_round_trip() {
    let mut h = harness();
    let mut updates = h.receiver.subscribe();

    let paused = h.receiver.handle_command(&signed("cmd-1", CommandType::Pause)).await;
    assert!(paused.success);
    assert_eq!(paused.previous_state, AgentState::Active);
    assert_eq!(paused.new_state, AgentState::Paused);
    assert!(updates.has_changed().unwrap());
    assert_eq!(*updates.borrow_and_update(), AgentState::Paused);

    let resumed = h.receiver.handle_command(&signed("cmd-2", CommandType::Resume)).await;
    assert!(resumed.success);
    assert_eq!(h.receiver.state(), AgentState::Active);
    assert_eq!(h.handler.calls(), vec![CommandType::Pause, CommandType::Resume]);
    assert_eq!(
        h.sink.names(),
        vec!["command_received", "state_changed", "command_received", "state_changed"]
    );
}

#[tokio::test]
async fn identical_terminate_twice_is_detected_as_replay() {
    let mut h = harness();
    let command = signed("cmd-term", CommandType::Terminate);

    let first = h.receiver.handle_command(&command).await;
    assert!(first.success);
    assert_eq!(first.new_state, AgentState::Terminated);

    let second = h.receiver.handle_command(&command).await;
    assert!(!second.success);
    assert_eq!(second.new_state, AgentState::Terminated);
    assert_eq!(h.handler.calls(), vec![CommandType::Terminate]);
    assert!(h.sink.events().iter().any(|event| matches!(
        event,
        LifecycleEvent::CommandRejected { replay: true, .. }
    )));
}

#[tokio::test]
async fn terminated_state_absorbs_later_commands() {
    let mut h = harness();
    h.receiver.handle_command(&signed("cmd-1", CommandType::Terminate)).await;

    let resume = h.receiver.handle_command(&signed("cmd-2", CommandType::Resume)).await;
    assert!(resume.success);
    assert_eq!(resume.error, None);
    assert_eq!(resume.previous_state, AgentState::Terminated);
    assert_eq!(resume.new_state, AgentState::Terminated);

    let pause = h.receiver.handle_command(&signed("cmd-3", CommandType::Pause)).await;
    assert!(pause.success);
    assert_eq!(h.receiver.state(), AgentState::Terminated);
    assert_eq!(h.handler.calls(), vec![CommandType::Terminate]);
}

#[tokio::test]
async fn redundant_pause_and_resume_are_no_ops() {
    let mut h = harness();
    let resume = h.receiver.handle_command(&signed("cmd-1", CommandType::Resume)).await;
    assert!(resume.success);
    assert_eq!(resume.new_state, AgentState::Active);

    h.receiver.handle_command(&signed("cmd-2", CommandType::Pause)).await;
    let again = h.receiver.handle_command(&signed("cmd-3", CommandType::Pause)).await;
    assert!(again.success);
    assert_eq!(again.new_state, AgentState::Paused);
    assert_eq!(h.handler.calls(), vec![CommandType::Pause]);
}

#[tokio::test]
async fn resume_is_refused_when_disabled() {
    let config = ReceiverConfig {
        allow_resume: false,
        ..ReceiverConfig::default()
    };
    let mut h = harness_with(config, RecordingHandler::default());
    h.receiver.handle_command(&signed("cmd-1", CommandType::Pause)).await;

    let outcome = h.receiver.handle_command(&signed("cmd-2", CommandType::Resume)).await;
    assert!(!outcome.success);
    assert_eq!(outcome.new_state, AgentState::Paused);
    assert!(!h.receiver.replay_guard().contains("cmd-2"));
    assert_eq!(h.sink.names().last(), Some(&"command_failed"));
}

// ============================================================================
// SECTION: Pipeline Failures
// ============================================================================

#[tokio::test]
async fn callback_failure_leaves_state_and_nonce_untouched() {
    let mut h = harness();
    h.handler.fail_on(Some(CommandType::Pause));
    let command = signed("cmd-1", CommandType::Pause);

    let failed = h.receiver.handle_command(&command).await;
    assert!(!failed.success);
    assert_eq!(failed.new_state, AgentState::Active);
    assert!(failed.error.unwrap().contains("callback failed"));
    assert!(!h.receiver.replay_guard().contains("cmd-1"));

    h.handler.fail_on(None);
    let retried = h.receiver.handle_command(&command).await;
    assert!(retried.success);
    assert_eq!(retried.new_state, AgentState::Paused);
}

#[tokio::test(start_paused = true)]
async fn slow_callback_times_out() {
    let config = ReceiverConfig {
        command_timeout: Duration::from_millis(50),
        ..ReceiverConfig::default()
    };
    let mut h = harness_with(config, RecordingHandler::slow(Duration::from_secs(5)));

    let outcome = h.receiver.handle_command(&signed("cmd-1", CommandType::Terminate)).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("timed out"));
    assert_eq!(h.receiver.state(), AgentState::Active);
    assert!(h.handler.calls().is_empty());
    assert!(!h.receiver.replay_guard().contains("cmd-1"));
}

#[tokio::test]
async fn bad_signature_never_advances_state() {
    let mut h = harness();
    let mut command = signed("cmd-1", CommandType::Terminate);
    command.reason = "edited after signing".to_string();

    let outcome = h.receiver.handle_command(&command).await;
    assert!(!outcome.success);
    assert_eq!(h.receiver.state(), AgentState::Active);
    assert!(h.handler.calls().is_empty());
    assert!(h.sink.events().iter().any(|event| matches!(
        event,
        LifecycleEvent::CommandRejected { replay: false, .. }
    )));
}

#[tokio::test]
async fn commands_for_other_instances_are_ignored() {
    let config = ReceiverConfig {
        identity: ReceiverIdentity {
            instance_id: Some("agent-1".to_string()),
            asset_id: Some("asset-9".to_string()),
            organization: None,
        },
        ..ReceiverConfig::default()
    };
    let mut h = harness_with(config, RecordingHandler::default());

    let mut other = unsigned("cmd-1", CommandType::Terminate);
    other.instance_id = Some("agent-2".to_string());
    let other = common::sign_with(other, &common::operator_key(), None);
    let ignored = h.receiver.handle_command(&other).await;
    assert!(!ignored.success);
    assert_eq!(h.sink.names(), vec!["command_received", "command_ignored"]);

    let mut ours = unsigned("cmd-2", CommandType::Pause);
    ours.instance_id = Some("agent-1".to_string());
    let ours = common::sign_with(ours, &common::operator_key(), None);
    assert!(h.receiver.handle_command(&ours).await.success);
}

#[tokio::test]
async fn disabled_verification_is_visible_in_events() {
    let config = ReceiverConfig {
        require_signature: false,
        ..ReceiverConfig::default()
    };
    let mut h = harness_with(config, RecordingHandler::default());

    let outcome = h.receiver.handle_command(&unsigned("cmd-1", CommandType::Pause)).await;
    assert!(outcome.success);
    assert_eq!(
        h.sink.names(),
        vec!["command_received", "verification_skipped", "state_changed"]
    );
}
