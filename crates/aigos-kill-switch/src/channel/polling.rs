// crates/aigos-kill-switch/src/channel/polling.rs
// ============================================================================
// Module: Polling Channel
// Description: Checkpointed HTTP polling listener for kill switch commands.
// Purpose: Reach agents that cannot hold a long-lived stream open.
// Dependencies: reqwest, serde, serde_json, tokio, url
// ============================================================================

//! ## Overview
//! [`PollingChannel`] issues `GET <endpoint>?since=<checkpoint>&instance_id=<id>`
//! every interval. The response body is
//! `{"commands": [...], "checkpoint": "..."}`; the checkpoint, when present,
//! replaces the stored cursor for the next poll. `connect` performs the first
//! poll so an unreachable endpoint fails the connection attempt.
//! Invariants:
//! - Response bodies are capped at [`super::MAX_CHANNEL_PAYLOAD_BYTES`].
//! - The checkpoint only advances after a successfully decoded response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use aigos_core::ControlChannel;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::ChannelError;
use super::ChannelListener;
use super::decode_command_values;
use super::enforce_payload_size;
use super::sse::ensure_http_scheme;
use crate::command::KillSwitchCommand;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polling channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingChannelConfig {
    /// Poll endpoint (http or https).
    pub endpoint: Url,
    /// Delay between polls.
    pub interval: Duration,
    /// Instance identifier sent with each poll.
    pub instance_id: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl PollingChannelConfig {
    /// Creates a configuration with default interval and timeout.
    #[must_use]
    pub const fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            interval: DEFAULT_POLL_INTERVAL,
            instance_id: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Poll response body.
#[derive(Debug, Deserialize)]
struct PollResponse {
    /// Commands published since the cursor.
    #[serde(default)]
    commands: Vec<Value>,
    /// Next cursor.
    #[serde(default)]
    checkpoint: Option<String>,
}

// ============================================================================
// SECTION: Listener
// ============================================================================

/// HTTP polling channel listener.
pub struct PollingChannel {
    /// Channel configuration.
    config: PollingChannelConfig,
    /// HTTP client.
    client: Client,
    /// Cursor returned by the last successful poll.
    checkpoint: Option<String>,
    /// Commands from the connect-time poll not yet handed out.
    pending: Vec<KillSwitchCommand>,
    /// Connection flag.
    connected: bool,
}

impl PollingChannel {
    /// Creates a polling listener.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Unsupported`] for non-HTTP endpoints and
    /// [`ChannelError::Connect`] when the HTTP client cannot be built.
    pub fn new(config: PollingChannelConfig) -> Result<Self, ChannelError> {
        ensure_http_scheme(&config.endpoint)?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ChannelError::Connect(err.to_string()))?;
        Ok(Self {
            config,
            client,
            checkpoint: None,
            pending: Vec::new(),
            connected: false,
        })
    }

    /// Returns the current cursor.
    #[must_use]
    pub fn checkpoint(&self) -> Option<&str> {
        self.checkpoint.as_deref()
    }

    /// Restores a persisted cursor.
    pub fn set_checkpoint(&mut self, checkpoint: Option<String>) {
        self.checkpoint = checkpoint;
    }

    /// Builds the poll URL for the current cursor.
    fn poll_url(&self) -> Url {
        let mut url = self.config.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(checkpoint) = &self.checkpoint {
                query.append_pair("since", checkpoint);
            }
            if let Some(instance_id) = &self.config.instance_id {
                query.append_pair("instance_id", instance_id);
            }
        }
        url
    }

    /// Performs one poll.
    async fn poll(&mut self) -> Result<Vec<KillSwitchCommand>, ChannelError> {
        let response = self
            .client
            .get(self.poll_url())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| ChannelError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Transport(format!("poll returned status {status}")));
        }
        if let Some(length) = response.content_length() {
            enforce_payload_size(usize::try_from(length).unwrap_or(usize::MAX))?;
        }
        let body = response.bytes().await.map_err(|err| ChannelError::Transport(err.to_string()))?;
        enforce_payload_size(body.len())?;
        let decoded: PollResponse =
            serde_json::from_slice(&body).map_err(|err| ChannelError::Decode(err.to_string()))?;
        if let Some(checkpoint) = decoded.checkpoint {
            self.checkpoint = Some(checkpoint);
        }
        Ok(decode_command_values(decoded.commands))
    }
}

#[async_trait]
impl ChannelListener for PollingChannel {
    fn kind(&self) -> ControlChannel {
        ControlChannel::Polling
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        let commands = self.poll().await.map_err(|err| ChannelError::Connect(err.to_string()))?;
        self.pending = commands;
        self.connected = true;
        Ok(())
    }

    async fn next_commands(&mut self) -> Result<Vec<KillSwitchCommand>, ChannelError> {
        if !self.connected {
            return Err(ChannelError::NotConnected);
        }
        if !self.pending.is_empty() {
            return Ok(std::mem::take(&mut self.pending));
        }
        loop {
            tokio::time::sleep(self.config.interval).await;
            let commands = match self.poll().await {
                Ok(commands) => commands,
                Err(err) => {
                    self.connected = false;
                    return Err(err);
                }
            };
            if !commands.is_empty() {
                return Ok(commands);
            }
        }
    }

    async fn disconnect(&mut self) {
        self.connected = false;
        self.pending.clear();
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
