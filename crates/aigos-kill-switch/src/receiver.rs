// crates/aigos-kill-switch/src/receiver.rs
// ============================================================================
// Module: Kill Switch Receiver
// Description: Command pipeline and ACTIVE/PAUSED/TERMINATED state machine.
// Purpose: Let operators pause, resume, or terminate a running agent.
// Dependencies: async-trait, thiserror, tokio, tracing
// ============================================================================

//! ## Overview
//! Each command passes through a fixed pipeline: target filter, signature
//! verification, replay check, then execution of the operator-supplied
//! [`ControlHandler`] callback under a hard timeout. Only a successful
//! execution commits the command's nonce and advances the state.
//! Invariants:
//! - `Terminated` is absorbing; later commands succeed as no-ops.
//! - State is mutated only inside [`KillSwitchReceiver::handle_command`],
//!   which takes `&mut self`, so commands never execute concurrently.
//! - Unknown or unverifiable commands never advance the state machine.
//!
//! Security posture: disabling signature verification is an escape hatch for
//! non-production use; every command accepted that way emits
//! `VerificationSkipped` and a warning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use aigos_core::Clock;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;
use tracing::warn;

use crate::channel::ChannelListener;
use crate::channel::ChannelSupervisor;
use crate::channel::ReconnectPolicy;
use crate::channel::SupervisorStep;
use crate::command::AgentState;
use crate::command::CommandType;
use crate::command::KillSwitchCommand;
use crate::command::ReceiverIdentity;
use crate::events::EventSink;
use crate::events::LifecycleEvent;
use crate::replay::DEFAULT_NONCE_CACHE_SIZE;
use crate::replay::ReplayGuard;
use crate::signature::DEFAULT_MAX_COMMAND_AGE_SECONDS;
use crate::signature::SignatureVerifier;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default command execution timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Receiver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Identity matched against command targets.
    pub identity: ReceiverIdentity,
    /// Whether commands must carry a valid signature.
    pub require_signature: bool,
    /// Whether RESUME may leave the paused state.
    pub allow_resume: bool,
    /// Hard limit on callback execution.
    pub command_timeout: Duration,
    /// Replay window in seconds.
    pub max_command_age_seconds: i64,
    /// Nonce cache capacity.
    pub nonce_cache_size: usize,
    /// Channel reconnect policy.
    pub reconnect: ReconnectPolicy,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            identity: ReceiverIdentity::default(),
            require_signature: true,
            allow_resume: true,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            max_command_age_seconds: DEFAULT_MAX_COMMAND_AGE_SECONDS,
            nonce_cache_size: DEFAULT_NONCE_CACHE_SIZE,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Error returned by a control callback.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Creates a handler error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Receiver construction and task errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Signatures are required but no key is trusted.
    #[error("signature verification is required but no trusted keys are configured")]
    NoTrustedKeys,
    /// Receiver task panicked or was aborted.
    #[error("receiver task failed: {0}")]
    Task(String),
}

// ============================================================================
// SECTION: Callbacks
// ============================================================================

/// Operator-supplied effects for each command.
///
/// Callbacks run under the receiver's command timeout. On timeout the
/// callback future is dropped, so implementations must tolerate cancellation
/// at any await point.
#[async_trait]
pub trait ControlHandler: Send + Sync {
    /// Stops the agent permanently.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the agent could not be stopped.
    async fn terminate(&self, command: &KillSwitchCommand) -> Result<(), HandlerError>;

    /// Suspends the agent.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the agent could not be paused.
    async fn pause(&self, command: &KillSwitchCommand) -> Result<(), HandlerError>;

    /// Resumes a paused agent.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the agent could not be resumed.
    async fn resume(&self, command: &KillSwitchCommand) -> Result<(), HandlerError>;
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of handling one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    /// Whether the command executed (including no-ops).
    pub success: bool,
    /// Command identifier.
    pub command_id: String,
    /// Command kind.
    pub command_type: CommandType,
    /// State before handling.
    pub previous_state: AgentState,
    /// State after handling.
    pub new_state: AgentState,
    /// Failure detail.
    pub error: Option<String>,
}

/// Planned effect of a command in the current state.
enum Transition {
    /// Leave state unchanged and succeed.
    NoOp,
    /// Refuse the command.
    Denied(String),
    /// Invoke the callback and move to the target state.
    Invoke(AgentState),
}

// ============================================================================
// SECTION: Receiver
// ============================================================================

/// Kill switch command receiver.
pub struct KillSwitchReceiver {
    /// Receiver configuration.
    config: ReceiverConfig,
    /// Command signature verifier.
    verifier: SignatureVerifier,
    /// Nonce cache.
    replay: ReplayGuard,
    /// Control callbacks.
    handler: Arc<dyn ControlHandler>,
    /// Lifecycle event sink.
    events: Arc<dyn EventSink>,
    /// Current state.
    state: AgentState,
    /// State broadcast.
    state_tx: watch::Sender<AgentState>,
}

impl KillSwitchReceiver {
    /// Creates a receiver in the `Active` state.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiverError::NoTrustedKeys`] when signatures are required
    /// and the verifier trusts no keys.
    pub fn new(
        config: ReceiverConfig,
        verifier: SignatureVerifier,
        handler: Arc<dyn ControlHandler>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ReceiverError> {
        if config.require_signature && verifier.is_empty() {
            return Err(ReceiverError::NoTrustedKeys);
        }
        if !config.require_signature {
            warn!("kill switch signature verification is disabled");
        }
        let replay =
            ReplayGuard::new(config.nonce_cache_size, config.max_command_age_seconds, clock);
        let (state_tx, _) = watch::channel(AgentState::Active);
        Ok(Self {
            config,
            verifier,
            replay,
            handler,
            events,
            state: AgentState::Active,
            state_tx,
        })
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> AgentState {
        self.state
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AgentState> {
        self.state_tx.subscribe()
    }

    /// Returns the replay guard.
    #[must_use]
    pub const fn replay_guard(&self) -> &ReplayGuard {
        &self.replay
    }

    /// Returns the replay guard for nonce import.
    pub const fn replay_guard_mut(&mut self) -> &mut ReplayGuard {
        &mut self.replay
    }

    /// Returns the signature verifier for key rotation.
    pub const fn verifier_mut(&mut self) -> &mut SignatureVerifier {
        &mut self.verifier
    }

    /// Runs one command through the pipeline.
    pub async fn handle_command(&mut self, command: &KillSwitchCommand) -> CommandOutcome {
        let previous = self.state;
        self.events.emit(&LifecycleEvent::CommandReceived {
            command_id: command.command_id.clone(),
            command_type: command.command_type,
        });

        if !self.config.identity.is_targeted_by(command) {
            let reason = "command is not targeted at this instance".to_string();
            self.events.emit(&LifecycleEvent::CommandIgnored {
                command_id: command.command_id.clone(),
                reason: reason.clone(),
            });
            return self.outcome(command, previous, Some(reason));
        }

        if self.config.require_signature {
            let check = self.verifier.verify(command);
            if !check.valid {
                let reason = check.reason.unwrap_or_else(|| "signature rejected".to_string());
                warn!(
                    command_id = %command.command_id,
                    reason = %reason,
                    "kill switch command rejected"
                );
                self.events.emit(&LifecycleEvent::CommandRejected {
                    command_id: command.command_id.clone(),
                    reason: reason.clone(),
                    replay: false,
                });
                return self.outcome(command, previous, Some(reason));
            }
        } else {
            warn!(
                command_id = %command.command_id,
                "kill switch command accepted without signature verification"
            );
            self.events.emit(&LifecycleEvent::VerificationSkipped {
                command_id: command.command_id.clone(),
            });
        }

        let replay = self.replay.check_command(command);
        if !replay.valid {
            let reason = replay.reason.unwrap_or_else(|| "replay check failed".to_string());
            warn!(
                command_id = %command.command_id,
                reason = %reason,
                "kill switch command rejected"
            );
            self.events.emit(&LifecycleEvent::CommandRejected {
                command_id: command.command_id.clone(),
                reason: reason.clone(),
                replay: replay.is_replay,
            });
            return self.outcome(command, previous, Some(reason));
        }

        let next = match self.plan(command.command_type) {
            Transition::NoOp => previous,
            Transition::Denied(reason) => return self.fail(command, previous, reason),
            Transition::Invoke(target) => match self.execute(command).await {
                Ok(()) => target,
                Err(reason) => return self.fail(command, previous, reason),
            },
        };

        self.replay.mark_processed(command);
        self.state = next;
        self.state_tx.send_replace(next);
        self.events.emit(&LifecycleEvent::StateChanged {
            command_id: command.command_id.clone(),
            previous,
            current: next,
        });
        info!(
            command_id = %command.command_id,
            command_type = %command.command_type,
            previous = %previous,
            current = %next,
            "kill switch command executed"
        );
        CommandOutcome {
            success: true,
            command_id: command.command_id.clone(),
            command_type: command.command_type,
            previous_state: previous,
            new_state: next,
            error: None,
        }
    }

    /// Spawns the listening loop on the current tokio runtime.
    #[must_use]
    pub fn start(self, listener: Box<dyn ChannelListener>) -> ReceiverHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = self.subscribe();
        let supervisor =
            ChannelSupervisor::new(listener, self.config.reconnect, Arc::clone(&self.events));
        let task = tokio::spawn(self.run(supervisor, shutdown_rx));
        ReceiverHandle {
            state,
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Receives and handles commands until shutdown, failure, or termination.
    async fn run(
        mut self,
        mut supervisor: ChannelSupervisor,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        while self.state != AgentState::Terminated {
            match supervisor.next_step(&mut shutdown).await {
                SupervisorStep::Commands(commands) => {
                    for command in &commands {
                        self.handle_command(command).await;
                        if self.state == AgentState::Terminated {
                            break;
                        }
                    }
                }
                SupervisorStep::Shutdown | SupervisorStep::Failed => return self,
            }
        }
        supervisor.close().await;
        self
    }

    /// Decides the effect of a command in the current state.
    fn plan(&self, command_type: CommandType) -> Transition {
        match (self.state, command_type) {
            (AgentState::Terminated, _)
            | (AgentState::Paused, CommandType::Pause)
            | (AgentState::Active, CommandType::Resume) => Transition::NoOp,
            (_, CommandType::Terminate) => Transition::Invoke(AgentState::Terminated),
            (AgentState::Active, CommandType::Pause) => Transition::Invoke(AgentState::Paused),
            (AgentState::Paused, CommandType::Resume) => {
                if self.config.allow_resume {
                    Transition::Invoke(AgentState::Active)
                } else {
                    Transition::Denied("resume is disabled for this agent".to_string())
                }
            }
        }
    }

    /// Invokes the callback under the command timeout.
    async fn execute(&self, command: &KillSwitchCommand) -> Result<(), String> {
        let handler = Arc::clone(&self.handler);
        let effect = async move {
            match command.command_type {
                CommandType::Terminate => handler.terminate(command).await,
                CommandType::Pause => handler.pause(command).await,
                CommandType::Resume => handler.resume(command).await,
            }
        };
        match tokio::time::timeout(self.config.command_timeout, effect).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!(
                "command execution timed out after {}ms",
                self.config.command_timeout.as_millis()
            )),
        }
    }

    /// Emits a failure event and builds a failed outcome.
    fn fail(
        &self,
        command: &KillSwitchCommand,
        previous: AgentState,
        reason: String,
    ) -> CommandOutcome {
        warn!(command_id = %command.command_id, error = %reason, "kill switch command failed");
        self.events.emit(&LifecycleEvent::CommandFailed {
            command_id: command.command_id.clone(),
            command_type: command.command_type,
            error: reason.clone(),
        });
        self.outcome(command, previous, Some(reason))
    }

    /// Builds an unsuccessful outcome with unchanged state.
    fn outcome(
        &self,
        command: &KillSwitchCommand,
        previous: AgentState,
        error: Option<String>,
    ) -> CommandOutcome {
        CommandOutcome {
            success: false,
            command_id: command.command_id.clone(),
            command_type: command.command_type,
            previous_state: previous,
            new_state: self.state,
            error,
        }
    }
}

// ============================================================================
// SECTION: Handle
// ============================================================================

/// Handle to a running receiver task.
///
/// Dropping the handle stops the listening loop.
pub struct ReceiverHandle {
    /// State updates.
    state: watch::Receiver<AgentState>,
    /// Shutdown signal.
    shutdown: watch::Sender<bool>,
    /// Listening task.
    task: JoinHandle<KillSwitchReceiver>,
}

impl ReceiverHandle {
    /// Returns the latest state.
    #[must_use]
    pub fn state(&self) -> AgentState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AgentState> {
        self.state.clone()
    }

    /// Returns true once the listening loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops listening and returns the receiver.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiverError::Task`] when the task panicked.
    pub async fn stop(self) -> Result<KillSwitchReceiver, ReceiverError> {
        self.shutdown.send_replace(true);
        self.join().await
    }

    /// Waits for the listening loop to exit on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiverError::Task`] when the task panicked.
    pub async fn join(self) -> Result<KillSwitchReceiver, ReceiverError> {
        let Self {
            task,
            shutdown,
            ..
        } = self;
        let result = task.await.map_err(|err| ReceiverError::Task(err.to_string()));
        // Dropping the sender signals shutdown, so it must outlive the task.
        drop(shutdown);
        result
    }
}
