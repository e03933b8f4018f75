// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Synchronization disciplines guarding the channel state
//!
//! Each variant carries only the primitives its mode needs. Notification
//! objects are touched exclusively from inside a critical section, so a waiter
//! that snapshots them under the lock cannot miss a wake-up.

use chan_sync::{Completion, Deadline, Interrupter, SpinLock, Semaphore, Wake, WaitQueue};
use parking_lot::Mutex;

use crate::channel::ChannelState;
use crate::config::SyncMode;
use crate::error::{ChannelError, Result};

/// What a suspended caller is waiting for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Event {
    Data,
    Space,
}

/// Wait parameters of the calling operation.
#[derive(Clone, Copy)]
pub(crate) struct WaitCtx<'a> {
    pub deadline: Deadline,
    pub interrupt: Option<&'a Interrupter>,
}

pub(crate) enum Discipline {
    /// Try-lock only: overlapping callers get `Busy` instead of waiting.
    Unsynchronized(Mutex<ChannelState>),
    Mutex(Mutex<ChannelState>),
    Semaphore {
        gate: Semaphore,
        state: Mutex<ChannelState>,
    },
    Completion {
        state: Mutex<ChannelState>,
        data_ready: Completion,
        space_ready: Completion,
    },
    Spinlock(SpinLock<ChannelState>),
    PollQueue {
        state: Mutex<ChannelState>,
        queue: WaitQueue,
    },
}

impl Discipline {
    pub fn new(mode: SyncMode, state: ChannelState) -> Self {
        match mode {
            SyncMode::None => Self::Unsynchronized(Mutex::new(state)),
            SyncMode::Mutex => Self::Mutex(Mutex::new(state)),
            SyncMode::Semaphore => Self::Semaphore { gate: Semaphore::binary(), state: Mutex::new(state) },
            SyncMode::Completion => Self::Completion {
                state: Mutex::new(state),
                data_ready: Completion::new(),
                space_ready: Completion::new(),
            },
            SyncMode::Spinlock => Self::Spinlock(SpinLock::new(state)),
            SyncMode::PollQueue => Self::PollQueue { state: Mutex::new(state), queue: WaitQueue::new() },
        }
    }

    pub fn mode(&self) -> SyncMode {
        match self {
            Self::Unsynchronized(_) => SyncMode::None,
            Self::Mutex(_) => SyncMode::Mutex,
            Self::Semaphore { .. } => SyncMode::Semaphore,
            Self::Completion { .. } => SyncMode::Completion,
            Self::Spinlock(_) => SyncMode::Spinlock,
            Self::PollQueue { .. } => SyncMode::PollQueue,
        }
    }

    /// Runs `f` inside this discipline's critical section.
    pub fn enter<R>(
        &self,
        ctx: &WaitCtx<'_>,
        wake: Wake,
        f: impl FnOnce(&mut ChannelState, &Notifier<'_>) -> R,
    ) -> Result<R> {
        let notifier = Notifier { discipline: self, wake };
        match self {
            Self::Unsynchronized(state) => {
                let mut guard = state.try_lock().ok_or(ChannelError::Busy)?;
                Ok(f(&mut *guard, &notifier))
            }
            Self::Mutex(state) | Self::Completion { state, .. } | Self::PollQueue { state, .. } => {
                Ok(f(&mut *state.lock(), &notifier))
            }
            Self::Semaphore { gate, state } => {
                let _permit = gate.acquire(ctx.deadline, ctx.interrupt)?;
                Ok(f(&mut *state.lock(), &notifier))
            }
            Self::Spinlock(state) => Ok(f(&mut *state.lock(), &notifier)),
        }
    }

    /// Suspends the caller until `event` may have happened.
    ///
    /// `seen` must come from [`Notifier::snapshot`] taken in the critical
    /// section that decided to wait. Wake-ups are hints: callers re-check.
    pub fn wait(&self, event: Event, seen: u64, ctx: &WaitCtx<'_>) -> Result<()> {
        match self {
            Self::Completion { data_ready, space_ready, .. } => {
                let completion = match event {
                    Event::Data => data_ready,
                    Event::Space => space_ready,
                };
                completion.wait(ctx.deadline, ctx.interrupt)?;
                Ok(())
            }
            Self::PollQueue { queue, .. } => {
                queue.wait_past(seen, ctx.deadline, ctx.interrupt)?;
                Ok(())
            }
            _ => Err(ChannelError::InvalidArgument),
        }
    }

    pub fn queue(&self) -> Option<&WaitQueue> {
        match self {
            Self::PollQueue { queue, .. } => Some(queue),
            _ => None,
        }
    }
}

/// Notification handle valid inside a critical section.
pub(crate) struct Notifier<'a> {
    discipline: &'a Discipline,
    wake: Wake,
}

impl Notifier<'_> {
    /// Wait-queue generation to pass to [`Discipline::wait`].
    pub fn snapshot(&self) -> u64 {
        self.discipline.queue().map_or(0, WaitQueue::generation)
    }

    /// New bytes are readable.
    pub fn data_ready(&self) {
        match self.discipline {
            Discipline::Completion { data_ready, .. } => signal(data_ready, self.wake),
            Discipline::PollQueue { queue, .. } => {
                queue.set_ready(true);
                queue.wake(self.wake);
            }
            _ => {}
        }
    }

    /// Room became available for appends.
    pub fn space_ready(&self) {
        match self.discipline {
            Discipline::Completion { space_ready, .. } => signal(space_ready, self.wake),
            Discipline::PollQueue { queue, .. } => queue.wake(self.wake),
            _ => {}
        }
    }

    /// Brings pending signals in line with the buffer after a mutation.
    ///
    /// Edge states drop stale signals so a sticky `complete_all` never
    /// outlives the condition it announced. Under wake-one, a completion whose
    /// condition still holds is signalled again, handing the wake-up on to the
    /// next waiter once the previous one has taken its share.
    pub fn settle(&self, state: &ChannelState) {
        let buffer = &state.buffer;
        match self.discipline {
            Discipline::Completion { data_ready, space_ready, .. } => {
                let chain = self.wake == Wake::One;
                if buffer.is_empty() {
                    data_ready.reinit();
                } else if chain && state.notify && !data_ready.is_done() {
                    data_ready.complete();
                }
                if buffer.free_space() == 0 {
                    space_ready.reinit();
                } else if chain && !space_ready.is_done() {
                    space_ready.complete();
                }
            }
            Discipline::PollQueue { queue, .. } if buffer.is_empty() => queue.set_ready(false),
            _ => {}
        }
    }

    /// Wakes waiters without a state change (external event source).
    pub fn external(&self) {
        match self.discipline {
            Discipline::Completion { data_ready, space_ready, .. } => {
                data_ready.complete();
                space_ready.complete();
            }
            Discipline::PollQueue { queue, .. } => queue.wake(Wake::All),
            _ => {}
        }
    }
}

fn signal(completion: &Completion, wake: Wake) {
    match wake {
        Wake::One => completion.complete(),
        Wake::All => completion.complete_all(),
    }
}
