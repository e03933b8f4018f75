// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared parking loop used by every blocking primitive in this crate.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, MutexGuard};

use crate::{Interrupter, WaitError};

// Waiters re-check their interrupter at least this often.
const INTERRUPT_POLL_SLICE: Duration = Duration::from_millis(5);

/// Absolute point in time after which a wait gives up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deadline {
    /// Wait until the condition holds or the waiter is interrupted.
    Never,
    /// Give up once this instant has passed.
    At(Instant),
}

impl Deadline {
    /// Deadline `budget` from now. Budgets too large to represent never expire.
    pub fn after(budget: Duration) -> Self {
        Instant::now().checked_add(budget).map_or(Self::Never, Self::At)
    }

    pub fn instant(self) -> Option<Instant> {
        match self {
            Self::Never => None,
            Self::At(at) => Some(at),
        }
    }

    pub fn has_expired(self) -> bool {
        matches!(self, Self::At(at) if Instant::now() >= at)
    }

    /// Time left before expiry; `None` for [`Deadline::Never`].
    pub fn remaining(self) -> Option<Duration> {
        self.instant().map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Parks on `cv` while `pending` holds, giving up on expiry or interruption.
///
/// `pending` is evaluated under the guard before every park, so a wake-up that
/// raced ahead of the park is never lost. Readiness wins over interruption: a
/// raised interrupter stays pending when the condition already holds.
pub(crate) fn park_while<T>(
    cv: &Condvar,
    guard: &mut MutexGuard<'_, T>,
    deadline: Deadline,
    interrupt: Option<&Interrupter>,
    mut pending: impl FnMut(&mut T) -> bool,
) -> Result<(), WaitError> {
    while pending(&mut **guard) {
        if interrupt.is_some_and(Interrupter::take) {
            return Err(WaitError::Interrupted);
        }
        let now = Instant::now();
        let slice_end = now + INTERRUPT_POLL_SLICE;
        let wake_at = match deadline {
            Deadline::Never => slice_end,
            Deadline::At(at) if now >= at => return Err(WaitError::TimedOut),
            Deadline::At(at) => at.min(slice_end),
        };
        cv.wait_until(guard, wake_at);
    }
    Ok(())
}
