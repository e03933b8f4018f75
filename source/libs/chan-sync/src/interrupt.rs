// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable token that aborts a pending wait, the way a delivered signal does.
///
/// Raising is sticky until a wait observes it: the next (or current) wait that
/// polls the token consumes the request and returns `WaitError::Interrupted`.
#[derive(Clone, Debug, Default)]
pub struct Interrupter {
    raised: Arc<AtomicBool>,
}

impl Interrupter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the owner's current or next wait be aborted.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Consumes a pending request. Returns `true` exactly once per `raise`.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Drops a pending request without reporting it.
    pub fn clear(&self) {
        self.raised.store(false, Ordering::Release);
    }
}
