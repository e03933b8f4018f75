// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Bounded shared byte channel with character-device semantics
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests per module, proptest for buffer invariants, tests/chan_e2e
//!
//! A channel is a fixed-capacity byte buffer shared by any number of
//! sessions. Producers write, consumers read, and the configured sync mode
//! decides how overlapping callers are ordered and whether a caller may sleep
//! until data or room appears.
//!
//! PUBLIC API:
//!   - Channel: create/open/deliver/notify/stats
//!   - Session: read/write/write_at/seek/control/poll/watch, released on drop
//!   - ChannelConfig: TOML-backed policy set (layout, read/overflow/session policies, sync mode)
//!   - Readable/Writable/Controllable: capability traits implemented by Session
//!   - EventSource/IntervalSource: external producers standing in for device interrupts
//!   - Transfer: caller-memory copy seam
//!
//! ERROR CONDITIONS:
//!   - ChannelError: per-operation failures, never poisoning the channel
//!   - ConfigError: rejected or unreadable configuration
//!
//! DEPENDENCIES:
//!   - chan-sync: spinlock, semaphore, completion, wait queue, interrupter
//!   - parking_lot: state mutexes
//!   - serde/toml: configuration
//!   - bitflags: poll readiness bits

#![forbid(unsafe_code)]

pub mod api;
mod buffer;
mod channel;
mod config;
mod control;
mod discipline;
mod error;
mod event;
mod ops;
mod poll;
mod session;
mod transfer;

pub use channel::{create_channel, Channel, ChannelStats, SessionId, SessionState};
pub use config::{
    ChannelConfig, ConfigError, EmptyRead, Layout, OverflowPolicy, ReadPolicy, ReleasePolicy,
    SessionPolicy, SyncMode, WakePolicy, DEFAULT_CAPACITY, DEFAULT_MAX_CAPACITY,
    DEFAULT_TIMEOUT_MS,
};
pub use control::{ControlOp, Field};
pub use error::{ChannelError, Result};
pub use event::{EventHandle, EventSource, IntervalSource};
pub use ops::{Controllable, Readable, Writable};
pub use poll::{PollEvents, PollWatcher};
pub use session::{AccessMode, Session, Whence};
pub use transfer::{DirectTransfer, FaultDirection, FaultyTransfer, Transfer, TransferFault};

pub use chan_sync::Interrupter;
