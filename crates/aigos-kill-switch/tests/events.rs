// crates/aigos-kill-switch/tests/events.rs
// ============================================================================
// Module: Lifecycle Event Sink Tests
// Description: Integration tests for the reference event sinks.
// Purpose: Validate JSON log records, channel delivery, and fan-out order.
// Dependencies: aigos-kill-switch, serde_json, tokio
// ============================================================================

//! ## Overview
//! Exercises [`aigos_kill_switch::LogEventSink`],
//! [`aigos_kill_switch::ChannelEventSink`], and [`aigos_kill_switch::EventBus`].

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

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use aigos_core::ControlChannel;
use aigos_kill_switch::AgentState;
use aigos_kill_switch::CallbackEventSink;
use aigos_kill_switch::ChannelEventSink;
use aigos_kill_switch::EventBus;
use aigos_kill_switch::EventSink;
use aigos_kill_switch::LifecycleEvent;
use aigos_kill_switch::LogEventSink;
use serde_json::Value;

/// Writer backed by a shared buffer.
#[derive(Clone, Default)]
struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    fn lines(&self) -> Vec<Value> {
        let bytes = self.inner.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Writer that always fails.
struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("simulated write failure"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn state_changed() -> LifecycleEvent {
    LifecycleEvent::StateChanged {
        command_id: "cmd-1".to_string(),
        previous: AgentState::Active,
        current: AgentState::Paused,
    }
}

#[test]
fn log_sink_writes_sequenced_json_lines() {
    let buffer = SharedBuffer::default();
    let sink = LogEventSink::new(buffer.clone());
    sink.emit(&state_changed());
    sink.emit(&LifecycleEvent::ChannelConnected {
        channel: ControlChannel::Polling,
    });

    let lines = buffer.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["seq"], 1);
    assert_eq!(lines[0]["event"], "state_changed");
    assert_eq!(lines[0]["previous"], "ACTIVE");
    assert_eq!(lines[0]["current"], "PAUSED");
    assert_eq!(lines[1]["seq"], 2);
    assert_eq!(lines[1]["channel"], "polling");
}

#[test]
fn log_sink_swallows_write_failures() {
    let sink = LogEventSink::new(FailingWriter);
    sink.emit(&state_changed());
}

#[tokio::test]
async fn channel_sink_delivers_and_drops_when_full() {
    let (sink, mut receiver) = ChannelEventSink::channel(1);
    sink.emit(&state_changed());
    sink.emit(&LifecycleEvent::VerificationSkipped {
        command_id: "cmd-2".to_string(),
    });
    assert_eq!(receiver.recv().await, Some(state_changed()));
    assert!(receiver.try_recv().is_err());
}

#[test]
fn bus_fans_out_in_registration_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&order);
    let second = Arc::clone(&order);
    let bus = EventBus::new()
        .with_sink(Arc::new(CallbackEventSink::new(move |event: &LifecycleEvent| {
            first.lock().unwrap().push(format!("a:{}", event.name()));
        })))
        .with_sink(Arc::new(CallbackEventSink::new(move |event: &LifecycleEvent| {
            second.lock().unwrap().push(format!("b:{}", event.name()));
        })));
    assert_eq!(bus.len(), 2);
    bus.emit(&state_changed());
    assert_eq!(*order.lock().unwrap(), vec!["a:state_changed", "b:state_changed"]);
}

#[test]
fn events_round_trip_through_json() {
    let event = LifecycleEvent::ChannelFailed {
        channel: ControlChannel::Sse,
        attempts: 10,
        error: "connection refused".to_string(),
        recoverable: false,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "channel_failed");
    assert_eq!(json["recoverable"], false);
    assert_eq!(serde_json::from_value::<LifecycleEvent>(json).unwrap(), event);
}
