// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Channel configuration, loadable from TOML.
//!
//! ```toml
//! capacity = 64
//! layout = "ring"
//! read_policy = "stream"
//! sync = "poll-queue"
//! blocking = true
//! timeout_ms = 250
//! ```

use std::path::Path;
use std::time::Duration;

use chan_sync::Wake;
use serde::{Deserialize, Serialize};

/// Default wait budget for blocking operations, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_CAPACITY: usize = 1024;
pub const DEFAULT_MAX_CAPACITY: usize = 1 << 20;

/// Cursor behaviour of the backing storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// Absolute cursors; space freed by reads is reclaimed only once the buffer drains.
    #[default]
    Linear,
    /// Wrap-around cursors modulo capacity.
    Ring,
}

/// What a successful read does to the bytes it did not return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadPolicy {
    /// Any successful read discards everything buffered (message semantics).
    #[default]
    ClearOnRead,
    /// Reads consume only what they return.
    Stream,
}

/// Append behaviour when the data does not fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Short write up to the free space; `Full` when there is none.
    #[default]
    Reject,
    /// Replace the contents with the first `capacity` bytes and report the whole
    /// request as written.
    Truncate,
    /// Replace the contents, growing storage when the request exceeds capacity.
    Reallocate,
}

/// Result of a non-blocking read on an empty channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyRead {
    /// Zero bytes, not an error.
    #[default]
    ZeroBytes,
    /// `ChannelError::Empty`.
    Error,
}

/// Admission policy for [`Channel::open`](crate::Channel::open).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPolicy {
    #[default]
    Shared,
    /// At most one open session; further opens fail with `Busy`.
    Exclusive,
}

/// Data lifetime relative to sessions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleasePolicy {
    /// Buffered data survives session close.
    #[default]
    Persist,
    /// Closing a session empties the channel.
    Clear,
}

/// Concurrency discipline guarding the buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// No waiting exclusion; overlapping access is refused with `Busy`.
    None,
    #[default]
    Mutex,
    /// Binary semaphore with timed, interruptible acquire.
    Semaphore,
    /// Mutex plus completions for data and space.
    Completion,
    /// Busy-wait lock; callers are never suspended.
    Spinlock,
    /// Mutex plus readiness flag and broadcast wait queue.
    PollQueue,
}

impl SyncMode {
    /// Whether callers can be suspended until data or room appears.
    pub const fn supports_blocking(self) -> bool {
        matches!(self, Self::Completion | Self::PollQueue)
    }

    /// Wake-up policy the mode uses unless configured otherwise.
    pub const fn default_wake(self) -> WakePolicy {
        match self {
            Self::PollQueue => WakePolicy::All,
            _ => WakePolicy::One,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WakePolicy {
    One,
    All,
}

impl From<WakePolicy> for Wake {
    fn from(policy: WakePolicy) -> Self {
        match policy {
            WakePolicy::One => Wake::One,
            WakePolicy::All => Wake::All,
        }
    }
}

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config encode: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Full channel configuration. Every key is optional in TOML.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    pub capacity: usize,
    pub max_capacity: usize,
    pub layout: Layout,
    pub read_policy: ReadPolicy,
    pub overflow: OverflowPolicy,
    pub empty_read: EmptyRead,
    pub session: SessionPolicy,
    pub release: ReleasePolicy,
    pub sync: SyncMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wake: Option<WakePolicy>,
    pub blocking: bool,
    pub timeout_ms: u64,
    pub notify: bool,
    /// Largest single write accepted; 0 disables the check.
    pub quota: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
            layout: Layout::default(),
            read_policy: ReadPolicy::default(),
            overflow: OverflowPolicy::default(),
            empty_read: EmptyRead::default(),
            session: SessionPolicy::default(),
            release: ReleasePolicy::default(),
            sync: SyncMode::default(),
            wake: None,
            blocking: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            notify: true,
            quota: 0,
        }
    }
}

impl ChannelConfig {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, ..Self::default() }
    }

    pub fn with_sync(mut self, sync: SyncMode) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_session(mut self, session: SessionPolicy) -> Self {
        self.session = session;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_read_policy(mut self, policy: ReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn with_overflow(mut self, policy: OverflowPolicy) -> Self {
        self.overflow = policy;
        self
    }

    pub fn with_empty_read(mut self, policy: EmptyRead) -> Self {
        self.empty_read = policy;
        self
    }

    pub fn with_release(mut self, policy: ReleasePolicy) -> Self {
        self.release = policy;
        self
    }

    pub fn with_wake(mut self, wake: WakePolicy) -> Self {
        self.wake = Some(wake);
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = quota;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Effective wake policy: the configured one, else the sync mode's default.
    pub fn wake_policy(&self) -> WakePolicy {
        self.wake.unwrap_or_else(|| self.sync.default_wake())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1"));
        }
        if self.capacity > self.max_capacity {
            return Err(ConfigError::Invalid("capacity exceeds max_capacity"));
        }
        if self.quota > self.max_capacity {
            return Err(ConfigError::Invalid("quota exceeds max_capacity"));
        }
        if self.blocking && !self.sync.supports_blocking() {
            return Err(ConfigError::Invalid("blocking requires sync = completion or poll-queue"));
        }
        if self.blocking && self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("blocking channels need a non-zero timeout_ms"));
        }
        // Readers, writers and watchers share one queue there.
        if self.sync == SyncMode::PollQueue && self.wake_policy() == WakePolicy::One {
            return Err(ConfigError::Invalid("sync = poll-queue only supports wake = all"));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
