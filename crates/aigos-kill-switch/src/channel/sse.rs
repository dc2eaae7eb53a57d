// crates/aigos-kill-switch/src/channel/sse.rs
// ============================================================================
// Module: Push-Stream Channel
// Description: Server-sent event listener for kill switch commands.
// Purpose: Receive commands as soon as the control plane publishes them.
// Dependencies: reqwest, url, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`SseChannel`] holds a long-lived GET request and parses the response
//! body incrementally. `data:` lines accumulate until a blank line ends the
//! event; a line that is itself a JSON object is dispatched immediately so
//! plain newline-delimited JSON streams work too. Comment, `event:`, `id:`
//! and `retry:` lines are ignored.
//! Invariants:
//! - A single pending line or event never exceeds
//!   [`super::MAX_CHANNEL_PAYLOAD_BYTES`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use aigos_core::ControlChannel;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::Response;
use reqwest::header::ACCEPT;
use reqwest::header::CACHE_CONTROL;
use tracing::debug;
use tracing::warn;
use url::Url;

use super::ChannelError;
use super::ChannelListener;
use super::enforce_payload_size;
use crate::command::KillSwitchCommand;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Push-stream channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseChannelConfig {
    /// Stream endpoint (http or https).
    pub endpoint: Url,
    /// Instance identifier sent as the `instance_id` query parameter.
    pub instance_id: Option<String>,
    /// Timeout for establishing the stream.
    pub connect_timeout: Duration,
}

impl SseChannelConfig {
    /// Creates a configuration with a 10 second connect timeout.
    #[must_use]
    pub const fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            instance_id: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

// ============================================================================
// SECTION: Event Parser
// ============================================================================

/// Incremental SSE framing parser.
#[derive(Debug, Default)]
pub(crate) struct SseParser {
    /// Bytes not yet terminated by a newline.
    pending: Vec<u8>,
    /// Accumulated `data:` payload for the current event.
    data: String,
}

impl SseParser {
    /// Feeds a chunk and returns the command payloads it completed.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, ChannelError> {
        self.pending.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(position) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=position).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(payload) = self.process_line(line) {
                payloads.push(payload);
            }
        }
        enforce_payload_size(self.pending.len().saturating_add(self.data.len()))?;
        Ok(payloads)
    }

    /// Handles one complete line.
    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.data));
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(value);
            return None;
        }
        if line.starts_with('{') && self.data.is_empty() {
            return Some(line.to_string());
        }
        None
    }
}

/// Decodes one event payload, skipping malformed commands.
fn decode_event(payload: &str) -> Option<KillSwitchCommand> {
    match serde_json::from_str::<KillSwitchCommand>(payload) {
        Ok(command) => Some(command),
        Err(err) => {
            warn!(error = %err, "skipping malformed push-stream event");
            None
        }
    }
}

// ============================================================================
// SECTION: Listener
// ============================================================================

/// Server-sent event channel listener.
pub struct SseChannel {
    /// Channel configuration.
    config: SseChannelConfig,
    /// HTTP client.
    client: Client,
    /// Open event stream.
    response: Option<Response>,
    /// Framing state.
    parser: SseParser,
}

impl SseChannel {
    /// Creates a push-stream listener.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Unsupported`] for non-HTTP endpoints and
    /// [`ChannelError::Connect`] when the HTTP client cannot be built.
    pub fn new(config: SseChannelConfig) -> Result<Self, ChannelError> {
        ensure_http_scheme(&config.endpoint)?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| ChannelError::Connect(err.to_string()))?;
        Ok(Self {
            config,
            client,
            response: None,
            parser: SseParser::default(),
        })
    }

    /// Returns the stream URL with query parameters applied.
    fn stream_url(&self) -> Url {
        let mut url = self.config.endpoint.clone();
        if let Some(instance_id) = &self.config.instance_id {
            url.query_pairs_mut().append_pair("instance_id", instance_id);
        }
        url
    }
}

#[async_trait]
impl ChannelListener for SseChannel {
    fn kind(&self) -> ControlChannel {
        ControlChannel::Sse
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        let response = self
            .client
            .get(self.stream_url())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|err| ChannelError::Connect(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Connect(format!("stream returned status {status}")));
        }
        debug!(endpoint = %self.config.endpoint, "push-stream connected");
        self.parser = SseParser::default();
        self.response = Some(response);
        Ok(())
    }

    async fn next_commands(&mut self) -> Result<Vec<KillSwitchCommand>, ChannelError> {
        loop {
            let Some(response) = self.response.as_mut() else {
                return Err(ChannelError::NotConnected);
            };
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => {
                    self.response = None;
                    return Err(ChannelError::Closed);
                }
                Err(err) => {
                    self.response = None;
                    return Err(ChannelError::Transport(err.to_string()));
                }
            };
            let commands: Vec<KillSwitchCommand> = self
                .parser
                .feed(&chunk)?
                .iter()
                .filter_map(|payload| decode_event(payload))
                .collect();
            if !commands.is_empty() {
                return Ok(commands);
            }
        }
    }

    async fn disconnect(&mut self) {
        self.response = None;
        self.parser = SseParser::default();
    }

    fn is_connected(&self) -> bool {
        self.response.is_some()
    }
}

/// Rejects endpoints that are not http or https.
pub(crate) fn ensure_http_scheme(url: &Url) -> Result<(), ChannelError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ChannelError::Unsupported(format!("endpoint scheme {other}"))),
    }
}
