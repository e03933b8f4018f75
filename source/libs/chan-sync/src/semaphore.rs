// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use parking_lot::{Condvar, Mutex};

use crate::wait::park_while;
use crate::{Deadline, Interrupter, WaitError};

/// Counting semaphore whose acquire can time out or be interrupted.
///
/// Releasing a permit wakes exactly one waiter.
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self { permits: Mutex::new(permits), available: Condvar::new() }
    }

    /// Semaphore with a single permit, usable as a sleeping lock.
    pub fn binary() -> Self {
        Self::new(1)
    }

    pub fn available_permits(&self) -> usize {
        *self.permits.lock()
    }

    pub fn try_acquire(&self) -> Option<SemaphorePermit<'_>> {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return None;
        }
        *permits -= 1;
        Some(SemaphorePermit { sem: self })
    }

    /// Waits for a permit until `deadline`, or until `interrupt` is raised.
    pub fn acquire(
        &self,
        deadline: Deadline,
        interrupt: Option<&Interrupter>,
    ) -> Result<SemaphorePermit<'_>, WaitError> {
        let mut permits = self.permits.lock();
        park_while(&self.available, &mut permits, deadline, interrupt, |p| *p == 0)?;
        *permits -= 1;
        Ok(SemaphorePermit { sem: self })
    }

    /// Returns a permit taken earlier with [`SemaphorePermit::forget`].
    pub fn release(&self) {
        let mut permits = self.permits.lock();
        *permits = permits.saturating_add(1);
        self.available.notify_one();
    }
}

/// Held permit; returned to the semaphore on drop.
#[must_use = "dropping the permit releases it immediately"]
pub struct SemaphorePermit<'a> {
    sem: &'a Semaphore,
}

impl SemaphorePermit<'_> {
    /// Keeps the permit checked out; pair with [`Semaphore::release`].
    pub fn forget(self) {
        core::mem::forget(self);
    }
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}
