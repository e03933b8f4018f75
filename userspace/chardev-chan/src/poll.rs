// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Readiness reporting and poll-queue watchers.

use std::sync::Arc;
use std::time::Duration;

use chan_sync::{Deadline, Interrupter};
use log::trace;

use crate::channel::{ChannelState, Shared};
use crate::config::OverflowPolicy;
use crate::error::{ChannelError, Result};

bitflags::bitflags! {
    /// Readiness bits, numerically compatible with `POLLIN`/`POLLOUT`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PollEvents: u32 {
        const READABLE = 1 << 0;
        const WRITABLE = 1 << 2;
    }
}

impl Shared {
    /// On a poll-queue channel `READABLE` mirrors the queue's readiness flag,
    /// which only notifying writes raise. Other modes look at the buffer.
    fn readiness(&self, state: &ChannelState) -> PollEvents {
        let mut events = PollEvents::empty();
        let readable = match self.discipline.queue() {
            Some(queue) => queue.is_ready(),
            None => !state.buffer.is_empty(),
        };
        if readable {
            events |= PollEvents::READABLE;
        }
        // Replacing policies always accept a write.
        if self.config.overflow != OverflowPolicy::Reject || state.buffer.free_space() > 0 {
            events |= PollEvents::WRITABLE;
        }
        events
    }

    pub(crate) fn poll(&self, interrupt: Option<&Interrupter>) -> Result<PollEvents> {
        self.locked(interrupt, |state, _| Ok(self.readiness(state)))
    }
}

/// Interest registered on a poll-queue channel's wait queue.
pub struct PollWatcher {
    shared: Arc<Shared>,
    interrupter: Interrupter,
    seen: u64,
}

impl PollWatcher {
    pub(crate) fn register(shared: Arc<Shared>, interrupter: Interrupter) -> Result<Self> {
        let seen = shared.discipline.queue().ok_or(ChannelError::InvalidArgument)?.generation();
        Ok(Self { shared, interrupter, seen })
    }

    /// `true` once the queue was woken since registration or the last wait.
    pub fn changed(&self) -> bool {
        self.shared.discipline.queue().is_some_and(|queue| queue.generation() != self.seen)
    }

    /// Blocks until any of `interest` is ready; returns the full readiness set.
    pub fn wait(&mut self, interest: PollEvents, timeout: Duration) -> Result<PollEvents> {
        let deadline = Deadline::after(timeout);
        let queue = self.shared.discipline.queue().ok_or(ChannelError::InvalidArgument)?;
        loop {
            let (events, generation) = self.shared.locked(None, |state, notifier| {
                Ok((self.shared.readiness(state), notifier.snapshot()))
            })?;
            self.seen = generation;
            if events.intersects(interest) {
                return Ok(events);
            }
            trace!("chardev-chan: watcher parked at generation {generation}");
            self.seen = queue.wait_past(generation, deadline, Some(&self.interrupter))?;
        }
    }
}
