// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Blocking and non-blocking synchronization primitives for device channels
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests per module
//!
//! PUBLIC API:
//!   - SpinLock: busy-wait lock that never parks the caller
//!   - Semaphore: counting semaphore with timeout and interruptible acquire
//!   - Completion: single-slot rendezvous (complete / complete_all / wait)
//!   - WaitQueue: readiness flag plus broadcast queue with generations
//!   - Interrupter: signal-like token that aborts one pending wait
//!   - Deadline: absolute wait budget
//!
//! ERROR CONDITIONS:
//!   - WaitError::TimedOut: deadline expired before the condition held
//!   - WaitError::Interrupted: an interrupter fired while waiting
//!
//! DEPENDENCIES:
//!   - parking_lot: Mutex/Condvar used by every parking primitive

mod completion;
mod interrupt;
mod semaphore;
mod spin;
mod wait;
mod waitqueue;

pub use completion::Completion;
pub use interrupt::Interrupter;
pub use semaphore::{Semaphore, SemaphorePermit};
pub use spin::{SpinLock, SpinLockGuard};
pub use wait::Deadline;
pub use waitqueue::{Wake, WaitQueue};

/// Why a blocking wait gave up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    /// The deadline passed before the awaited condition held.
    #[error("wait timed out")]
    TimedOut,
    /// The waiter was interrupted before the awaited condition held.
    #[error("wait interrupted")]
    Interrupted,
}
