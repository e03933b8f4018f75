// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Channel handle, admission control and the read/write state machine
//!
//! OWNERS: @runtime
//!
//! INVARIANTS:
//!   - Every mutation of buffer, counters and notification state happens
//!     inside `Discipline::enter`
//!   - A failed operation (including a transfer fault) commits nothing
//!   - Under `SessionPolicy::Exclusive` at most one session is open

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chan_sync::{Deadline, Interrupter, Wake};
use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use crate::buffer::ChannelBuffer;
use crate::config::{
    ChannelConfig, ConfigError, EmptyRead, OverflowPolicy, ReleasePolicy, SessionPolicy, SyncMode,
};
use crate::discipline::{Discipline, Event, Notifier, WaitCtx};
use crate::error::{ChannelError, Result};
use crate::session::{AccessMode, Session};
use crate::transfer::{DirectTransfer, Transfer};

/// Identifier handed to each opened session, unique per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Exclusive-open state of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Open(SessionId),
}

/// Diagnostics snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub capacity: usize,
    pub length: usize,
    pub open_count: u64,
    pub active_sessions: usize,
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub writes: u64,
    pub reads: u64,
    pub faults: u64,
    /// Bytes accepted but discarded by the truncating overflow policy.
    pub dropped_bytes: u64,
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Counters {
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub writes: u64,
    pub reads: u64,
    pub faults: u64,
    pub dropped_bytes: u64,
}

/// Everything guarded by the sync discipline.
pub(crate) struct ChannelState {
    pub buffer: ChannelBuffer,
    pub notify: bool,
    pub quota: usize,
    pub counters: Counters,
}

impl ChannelState {
    fn check_quota(&self, len: usize) -> Result<()> {
        if self.quota != 0 && len > self.quota {
            return Err(ChannelError::TooLarge);
        }
        Ok(())
    }
}

struct Admission {
    state: SessionState,
    next_id: u64,
    active: usize,
}

enum Step<T> {
    Done(T),
    Wait(Event, u64),
}

pub(crate) struct Shared {
    pub(crate) config: ChannelConfig,
    pub(crate) discipline: Discipline,
    wake: Wake,
    timeout_ms: AtomicU64,
    // Read from inside critical sections, which must not park.
    opens: AtomicU64,
    admission: Mutex<Admission>,
    transfer: Arc<dyn Transfer>,
}

/// Cloneable handle to one bounded channel.
///
/// All clones refer to the same storage; it is released with the last handle
/// or session.
#[derive(Clone)]
pub struct Channel {
    shared: Arc<Shared>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel").field("config", &self.shared.config).finish_non_exhaustive()
    }
}

impl Channel {
    /// Creates a channel with in-process copies.
    pub fn new(config: ChannelConfig) -> core::result::Result<Self, ConfigError> {
        Self::with_transfer(config, Arc::new(DirectTransfer))
    }

    /// Creates a channel whose caller copies go through `transfer`.
    pub fn with_transfer(
        config: ChannelConfig,
        transfer: Arc<dyn Transfer>,
    ) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        let state = ChannelState {
            buffer: ChannelBuffer::new(config.capacity, config.layout),
            notify: config.notify,
            quota: config.quota,
            counters: Counters::default(),
        };
        info!(
            "chardev-chan: created capacity={} layout={:?} sync={:?} session={:?}",
            config.capacity, config.layout, config.sync, config.session
        );
        let shared = Shared {
            discipline: Discipline::new(config.sync, state),
            wake: config.wake_policy().into(),
            timeout_ms: AtomicU64::new(config.timeout_ms),
            opens: AtomicU64::new(0),
            admission: Mutex::new(Admission {
                state: SessionState::Idle,
                next_id: 1,
                active: 0,
            }),
            transfer,
            config,
        };
        Ok(Self { shared: Arc::new(shared) })
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.shared.config
    }

    pub fn sync_mode(&self) -> SyncMode {
        self.shared.discipline.mode()
    }

    pub fn session_state(&self) -> SessionState {
        self.shared.admission.lock().state
    }

    /// Current wait budget for blocking operations.
    pub fn timeout(&self) -> Duration {
        self.shared.timeout()
    }

    /// Opens a read-write session.
    pub fn open(&self) -> Result<Session> {
        self.open_with(AccessMode::ReadWrite)
    }

    /// Opens a session restricted to `mode`.
    ///
    /// Fails with `Busy` under the exclusive policy while another session is open.
    pub fn open_with(&self, mode: AccessMode) -> Result<Session> {
        let id = self.shared.admit()?;
        Ok(Session::new(id, mode, Arc::clone(&self.shared)))
    }

    /// Device-side producer entry point (interrupt bottom half).
    ///
    /// Appends like a session write but never blocks and ignores session ownership.
    pub fn deliver(&self, data: &[u8]) -> Result<usize> {
        let written = self.shared.append(data, None, false)?;
        debug!("chardev-chan: delivered {written} bytes from event source");
        Ok(written)
    }

    /// Wakes every waiter without touching data. Waiters re-check their condition.
    pub fn notify(&self) -> Result<()> {
        self.shared.notify()
    }

    pub fn stats(&self) -> Result<ChannelStats> {
        self.shared.stats()
    }
}

impl Shared {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }

    pub(crate) fn set_timeout_ms(&self, ms: u64) {
        self.timeout_ms.store(ms, Ordering::Relaxed);
    }

    pub(crate) fn open_count(&self) -> u64 {
        self.opens.load(Ordering::Relaxed)
    }

    pub(crate) fn wait_ctx<'a>(&self, interrupt: Option<&'a Interrupter>) -> WaitCtx<'a> {
        WaitCtx { deadline: Deadline::after(self.timeout()), interrupt }
    }

    /// Runs `f` once inside the critical section.
    pub(crate) fn locked<R>(
        &self,
        interrupt: Option<&Interrupter>,
        f: impl FnOnce(&mut ChannelState, &Notifier<'_>) -> Result<R>,
    ) -> Result<R> {
        let ctx = self.wait_ctx(interrupt);
        self.discipline.enter(&ctx, self.wake, f)?
    }

    /// Retries `attempt` in the critical section until it finishes, parking
    /// between attempts when it asks to wait.
    fn run<T>(
        &self,
        ctx: &WaitCtx<'_>,
        mut attempt: impl FnMut(&mut ChannelState, &Notifier<'_>) -> Result<Step<T>>,
    ) -> Result<T> {
        loop {
            match self.discipline.enter(ctx, self.wake, &mut attempt)?? {
                Step::Done(value) => return Ok(value),
                Step::Wait(event, seen) => {
                    trace!("chardev-chan: waiting for {event:?}");
                    self.discipline.wait(event, seen, ctx)?;
                }
            }
        }
    }

    fn admit(&self) -> Result<SessionId> {
        let mut admission = self.admission.lock();
        if self.config.session == SessionPolicy::Exclusive {
            if let SessionState::Open(owner) = admission.state {
                warn!("chardev-chan: open refused, held by {owner}");
                return Err(ChannelError::Busy);
            }
        }
        let id = SessionId(admission.next_id);
        admission.next_id += 1;
        let opens = self.opens.fetch_add(1, Ordering::Relaxed) + 1;
        admission.active += 1;
        if self.config.session == SessionPolicy::Exclusive {
            admission.state = SessionState::Open(id);
        }
        info!("chardev-chan: session {id} opened ({opens} opens so far)");
        Ok(id)
    }

    /// Fails with `Busy` when `id` does not own an exclusive channel.
    pub(crate) fn check_owner(&self, id: SessionId) -> Result<()> {
        if self.config.session == SessionPolicy::Exclusive
            && self.admission.lock().state != SessionState::Open(id)
        {
            return Err(ChannelError::Busy);
        }
        Ok(())
    }

    pub(crate) fn release(&self, id: SessionId) {
        {
            let mut admission = self.admission.lock();
            if admission.state == SessionState::Open(id) {
                admission.state = SessionState::Idle;
            }
            admission.active = admission.active.saturating_sub(1);
        }
        if self.config.release == ReleasePolicy::Clear {
            let cleared = self.locked(None, |state, notifier| {
                state.buffer.clear();
                notifier.space_ready();
                notifier.settle(state);
                Ok(())
            });
            if let Err(err) = cleared {
                warn!("chardev-chan: session {id} released without clearing: {err}");
            }
        }
        info!("chardev-chan: session {id} released");
    }

    fn stage_in(&self, state: &mut ChannelState, src: &[u8]) -> Result<Vec<u8>> {
        let mut staged = vec![0u8; src.len()];
        if let Err(fault) = self.transfer.copy_from_caller(src, &mut staged) {
            state.counters.faults += 1;
            warn!("chardev-chan: copy from caller failed ({} bytes)", src.len());
            return Err(fault.into());
        }
        Ok(staged)
    }

    fn stage_out(&self, state: &mut ChannelState, src: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![0u8; src.len()];
        if let Err(fault) = self.transfer.copy_to_caller(src, &mut out) {
            state.counters.faults += 1;
            warn!("chardev-chan: copy to caller failed ({} bytes)", src.len());
            return Err(fault.into());
        }
        Ok(out)
    }

    /// Appends at the write cursor according to the overflow policy.
    pub(crate) fn append(
        &self,
        data: &[u8],
        interrupt: Option<&Interrupter>,
        may_block: bool,
    ) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let block = may_block && self.config.blocking;
        let ctx = self.wait_ctx(interrupt);
        self.run(&ctx, |state, notifier| {
            state.check_quota(data.len())?;
            let (accepted, stored) = match self.config.overflow {
                OverflowPolicy::Reject => {
                    let n = data.len().min(state.buffer.free_space());
                    if n == 0 {
                        return if block {
                            Ok(Step::Wait(Event::Space, notifier.snapshot()))
                        } else {
                            Err(ChannelError::Full)
                        };
                    }
                    let staged = self.stage_in(state, &data[..n])?;
                    state.buffer.append(&staged);
                    (n, n)
                }
                OverflowPolicy::Truncate => {
                    let n = data.len().min(state.buffer.capacity());
                    let staged = self.stage_in(state, &data[..n])?;
                    state.buffer.replace(&staged);
                    state.counters.dropped_bytes += (data.len() - n) as u64;
                    (data.len(), n)
                }
                OverflowPolicy::Reallocate => {
                    if data.len() > self.config.max_capacity {
                        return Err(ChannelError::TooLarge);
                    }
                    let staged = self.stage_in(state, data)?;
                    if staged.len() > state.buffer.capacity() {
                        debug!(
                            "chardev-chan: reallocating {} -> {} bytes",
                            state.buffer.capacity(),
                            staged.len()
                        );
                        state.buffer.reallocate(staged.len());
                    }
                    state.buffer.replace(&staged);
                    (data.len(), data.len())
                }
            };
            state.counters.writes += 1;
            state.counters.bytes_written += stored as u64;
            trace!("chardev-chan: wrote {stored}/{} bytes, length {}", data.len(), state.buffer.len());
            if state.notify {
                notifier.data_ready();
            }
            notifier.settle(state);
            Ok(Step::Done(accepted))
        })
    }

    /// Writes at a logical offset; never blocks.
    pub(crate) fn write_at(
        &self,
        offset: usize,
        data: &[u8],
        interrupt: Option<&Interrupter>,
    ) -> Result<usize> {
        self.locked(interrupt, |state, notifier| {
            state.check_quota(data.len())?;
            let end = offset.checked_add(data.len()).ok_or(ChannelError::TooLarge)?;
            if end > state.buffer.capacity() {
                return Err(ChannelError::TooLarge);
            }
            if data.is_empty() {
                return Ok(0);
            }
            let staged = self.stage_in(state, data)?;
            let written = state.buffer.write_at(offset, &staged)?;
            state.counters.writes += 1;
            state.counters.bytes_written += written as u64;
            if state.notify {
                notifier.data_ready();
            }
            notifier.settle(state);
            Ok(written)
        })
    }

    /// Consuming read from the read cursor.
    pub(crate) fn read(&self, max_len: usize, interrupt: Option<&Interrupter>) -> Result<Vec<u8>> {
        if max_len == 0 {
            return Ok(Vec::new());
        }
        let ctx = self.wait_ctx(interrupt);
        self.run(&ctx, |state, notifier| {
            if state.buffer.is_empty() {
                if self.config.blocking {
                    return Ok(Step::Wait(Event::Data, notifier.snapshot()));
                }
                return match self.config.empty_read {
                    EmptyRead::ZeroBytes => Ok(Step::Done(Vec::new())),
                    EmptyRead::Error => Err(ChannelError::Empty),
                };
            }
            let peeked = state.buffer.peek(max_len);
            let out = self.stage_out(state, &peeked)?;
            state.buffer.consume(out.len(), self.config.read_policy);
            state.counters.reads += 1;
            state.counters.bytes_read += out.len() as u64;
            trace!("chardev-chan: read {} bytes, length {}", out.len(), state.buffer.len());
            notifier.space_ready();
            notifier.settle(state);
            Ok(Step::Done(out))
        })
    }

    /// Non-consuming read `offset` bytes past the read cursor.
    pub(crate) fn read_at(
        &self,
        offset: usize,
        max_len: usize,
        interrupt: Option<&Interrupter>,
    ) -> Result<Vec<u8>> {
        self.locked(interrupt, |state, _| {
            let peeked = state.buffer.peek_at(offset, max_len);
            if peeked.is_empty() {
                return Ok(peeked);
            }
            let out = self.stage_out(state, &peeked)?;
            state.counters.reads += 1;
            state.counters.bytes_read += out.len() as u64;
            Ok(out)
        })
    }

    pub(crate) fn length(&self, interrupt: Option<&Interrupter>) -> Result<usize> {
        self.locked(interrupt, |state, _| Ok(state.buffer.len()))
    }

    pub(crate) fn capacity(&self, interrupt: Option<&Interrupter>) -> Result<usize> {
        self.locked(interrupt, |state, _| Ok(state.buffer.capacity()))
    }

    fn notify(&self) -> Result<()> {
        self.locked(None, |_, notifier| {
            notifier.external();
            Ok(())
        })?;
        debug!("chardev-chan: external notify");
        Ok(())
    }

    fn stats(&self) -> Result<ChannelStats> {
        let open_count = self.open_count();
        let active_sessions = self.admission.lock().active;
        self.locked(None, |state, _| {
            let c = state.counters;
            Ok(ChannelStats {
                capacity: state.buffer.capacity(),
                length: state.buffer.len(),
                open_count,
                active_sessions,
                bytes_written: c.bytes_written,
                bytes_read: c.bytes_read,
                writes: c.writes,
                reads: c.reads,
                faults: c.faults,
                dropped_bytes: c.dropped_bytes,
            })
        })
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        info!("chardev-chan: channel torn down");
    }
}

/// Creates a channel with default policies for everything but the three
/// parameters hosts usually pick.
pub fn create_channel(
    capacity: usize,
    sync_mode: SyncMode,
    session_policy: SessionPolicy,
) -> core::result::Result<Channel, ConfigError> {
    Channel::new(ChannelConfig::new(capacity).with_sync(sync_mode).with_session(session_policy))
}
