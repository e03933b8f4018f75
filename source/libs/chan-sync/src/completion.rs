// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use parking_lot::{Condvar, Mutex};

use crate::wait::park_while;
use crate::{Deadline, Interrupter, WaitError};

// `complete_all` parks the counter here; waits stop decrementing it.
const DONE_ALL: u32 = u32::MAX;

/// Single-slot rendezvous between a signalling side and waiting side.
///
/// Every [`complete`](Self::complete) releases exactly one wait (now or later).
/// [`complete_all`](Self::complete_all) releases every current and future wait
/// until [`reinit`](Self::reinit).
pub struct Completion {
    done: Mutex<u32>,
    signalled: Condvar,
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

impl Completion {
    pub fn new() -> Self {
        Self { done: Mutex::new(0), signalled: Condvar::new() }
    }

    /// Signals one waiter.
    pub fn complete(&self) {
        let mut done = self.done.lock();
        if *done != DONE_ALL {
            *done = done.saturating_add(1).min(DONE_ALL - 1);
        }
        self.signalled.notify_one();
    }

    /// Signals every waiter, including those that arrive later.
    pub fn complete_all(&self) {
        *self.done.lock() = DONE_ALL;
        self.signalled.notify_all();
    }

    /// Forgets all pending signals.
    pub fn reinit(&self) {
        *self.done.lock() = 0;
    }

    pub fn is_done(&self) -> bool {
        *self.done.lock() != 0
    }

    /// Consumes a pending signal without blocking.
    pub fn try_wait(&self) -> bool {
        let mut done = self.done.lock();
        Self::consume(&mut done)
    }

    /// Waits for a signal until `deadline` or until `interrupt` is raised.
    pub fn wait(&self, deadline: Deadline, interrupt: Option<&Interrupter>) -> Result<(), WaitError> {
        let mut done = self.done.lock();
        park_while(&self.signalled, &mut done, deadline, interrupt, |d| *d == 0)?;
        Self::consume(&mut done);
        Ok(())
    }

    fn consume(done: &mut u32) -> bool {
        match *done {
            0 => false,
            DONE_ALL => true,
            _ => {
                *done -= 1;
                true
            }
        }
    }
}
