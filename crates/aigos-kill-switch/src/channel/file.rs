// crates/aigos-kill-switch/src/channel/file.rs
// ============================================================================
// Module: File Channel
// Description: Modification-time polling of a local command file.
// Purpose: Deliver commands to air-gapped agents through a shared file.
// Dependencies: tokio, tracing
// ============================================================================

//! ## Overview
//! [`FileChannel`] checks the configured path every interval and re-reads it
//! only when its modification time or length changed. The file holds a JSON
//! array of commands or a single command object. A file already present at
//! connect time is read on the first check; the receiver's replay guard and
//! age window discard anything stale.
//! Invariants:
//! - A missing file is not an error; the channel waits for it to appear.
//! - Malformed content is skipped with a warning and not re-read until the
//!   file changes again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;

use aigos_core::ControlChannel;
use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tracing::warn;

use super::ChannelError;
use super::ChannelListener;
use super::MAX_CHANNEL_PAYLOAD_BYTES;
use super::decode_command_batch;
use super::enforce_payload_size;
use crate::command::KillSwitchCommand;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// File channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChannelConfig {
    /// Command file path.
    pub path: PathBuf,
    /// Delay between modification checks.
    pub interval: Duration,
}

impl FileChannelConfig {
    /// Creates a configuration with a one second interval.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            interval: Duration::from_secs(1),
        }
    }
}

/// File change fingerprint.
type Fingerprint = (Option<SystemTime>, u64);

// ============================================================================
// SECTION: Listener
// ============================================================================

/// File-modification channel listener.
pub struct FileChannel {
    /// Channel configuration.
    config: FileChannelConfig,
    /// Fingerprint of the last content read.
    last_seen: Option<Fingerprint>,
    /// Connection flag.
    connected: bool,
    /// Whether the next check runs without waiting.
    check_now: bool,
}

impl FileChannel {
    /// Creates a file listener.
    #[must_use]
    pub const fn new(config: FileChannelConfig) -> Self {
        Self {
            config,
            last_seen: None,
            connected: false,
            check_now: false,
        }
    }

    /// Reads the file when it changed since the last read.
    async fn check(&mut self) -> Result<Vec<KillSwitchCommand>, ChannelError> {
        let metadata = match tokio::fs::metadata(&self.config.path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(ChannelError::Transport(err.to_string())),
        };
        let fingerprint = (metadata.modified().ok(), metadata.len());
        if self.last_seen == Some(fingerprint) {
            return Ok(Vec::new());
        }
        self.last_seen = Some(fingerprint);
        let bytes = self.read_capped().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        match decode_command_batch(&bytes) {
            Ok(commands) => Ok(commands),
            Err(err) => {
                warn!(
                    path = %self.config.path.display(),
                    error = %err,
                    "skipping malformed command file"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Reads at most the payload cap plus one byte.
    async fn read_capped(&self) -> Result<Vec<u8>, ChannelError> {
        let file = tokio::fs::File::open(&self.config.path)
            .await
            .map_err(|err| ChannelError::Transport(err.to_string()))?;
        let limit = u64::try_from(MAX_CHANNEL_PAYLOAD_BYTES)
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        let mut bytes = Vec::new();
        file.take(limit)
            .read_to_end(&mut bytes)
            .await
            .map_err(|err| ChannelError::Transport(err.to_string()))?;
        enforce_payload_size(bytes.len())?;
        Ok(bytes)
    }
}

#[async_trait]
impl ChannelListener for FileChannel {
    fn kind(&self) -> ControlChannel {
        ControlChannel::File
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        let parent = self
            .config
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let metadata = tokio::fs::metadata(&parent)
            .await
            .map_err(|err| ChannelError::Connect(format!("{}: {err}", parent.display())))?;
        if !metadata.is_dir() {
            return Err(ChannelError::Connect(format!("{} is not a directory", parent.display())));
        }
        self.connected = true;
        self.check_now = true;
        Ok(())
    }

    async fn next_commands(&mut self) -> Result<Vec<KillSwitchCommand>, ChannelError> {
        if !self.connected {
            return Err(ChannelError::NotConnected);
        }
        loop {
            if self.check_now {
                self.check_now = false;
            } else {
                tokio::time::sleep(self.config.interval).await;
            }
            let commands = match self.check().await {
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
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
