// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use parking_lot::{Condvar, Mutex};

use crate::wait::park_while;
use crate::{Deadline, Interrupter, WaitError};

/// How many parked waiters a wake-up releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wake {
    One,
    All,
}

#[derive(Default)]
struct QueueState {
    ready: bool,
    generation: u64,
}

/// Readiness flag plus a broadcast queue.
///
/// Each wake-up bumps a generation counter. A waiter snapshots the generation
/// while holding whatever lock guards the condition it cares about, drops that
/// lock, then parks until the generation moves past its snapshot.
#[derive(Default)]
pub struct WaitQueue {
    state: Mutex<QueueState>,
    woken: Condvar,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Readiness inquiry; never blocks on the queue.
    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.lock().ready = ready;
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Advances the generation and releases one or all parked waiters.
    pub fn wake(&self, wake: Wake) {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        match wake {
            Wake::One => {
                self.woken.notify_one();
            }
            Wake::All => {
                self.woken.notify_all();
            }
        }
    }

    /// Parks until the generation differs from `seen`; returns the new generation.
    pub fn wait_past(
        &self,
        seen: u64,
        deadline: Deadline,
        interrupt: Option<&Interrupter>,
    ) -> Result<u64, WaitError> {
        let mut state = self.state.lock();
        park_while(&self.woken, &mut state, deadline, interrupt, |s| s.generation == seen)?;
        Ok(state.generation)
    }
}
