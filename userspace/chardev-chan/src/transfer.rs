// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Caller-memory copy seam.
//!
//! Hosts that sit behind a protection boundary plug their copy primitives in
//! here; a failed copy aborts the current operation before anything is
//! committed to the channel.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ChannelError;

/// Opaque failure of a caller-memory copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("caller memory copy failed")]
pub struct TransferFault;

impl From<TransferFault> for ChannelError {
    fn from(_: TransferFault) -> Self {
        ChannelError::TransferFault
    }
}

/// Copy primitives between caller memory and channel staging buffers.
///
/// `src` and `dst` always have equal length.
pub trait Transfer: Send + Sync {
    /// Caller -> channel (write path).
    fn copy_from_caller(&self, src: &[u8], dst: &mut [u8]) -> Result<(), TransferFault>;
    /// Channel -> caller (read path).
    fn copy_to_caller(&self, src: &[u8], dst: &mut [u8]) -> Result<(), TransferFault>;
}

/// Plain in-process copy; never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectTransfer;

impl Transfer for DirectTransfer {
    fn copy_from_caller(&self, src: &[u8], dst: &mut [u8]) -> Result<(), TransferFault> {
        dst.copy_from_slice(src);
        Ok(())
    }

    fn copy_to_caller(&self, src: &[u8], dst: &mut [u8]) -> Result<(), TransferFault> {
        dst.copy_from_slice(src);
        Ok(())
    }
}

/// Which direction a [`FaultyTransfer`] fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultDirection {
    FromCaller,
    ToCaller,
    Both,
}

/// Copy primitive that fails after a number of successful copies.
///
/// Used to exercise the rollback paths the way a bad user pointer would.
#[derive(Debug)]
pub struct FaultyTransfer {
    direction: FaultDirection,
    remaining_ok: AtomicU64,
    faults: AtomicU64,
}

impl FaultyTransfer {
    /// Fails every copy in `direction` once `successes` copies went through.
    pub fn after(successes: u64, direction: FaultDirection) -> Self {
        Self { direction, remaining_ok: AtomicU64::new(successes), faults: AtomicU64::new(0) }
    }

    /// Fails every copy in `direction`.
    pub fn always(direction: FaultDirection) -> Self {
        Self::after(0, direction)
    }

    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    fn attempt(&self, direction: FaultDirection, src: &[u8], dst: &mut [u8]) -> Result<(), TransferFault> {
        let armed = self.direction == FaultDirection::Both || self.direction == direction;
        if armed
            && self
                .remaining_ok
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
                .is_err()
        {
            self.faults.fetch_add(1, Ordering::Relaxed);
            return Err(TransferFault);
        }
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl Transfer for FaultyTransfer {
    fn copy_from_caller(&self, src: &[u8], dst: &mut [u8]) -> Result<(), TransferFault> {
        self.attempt(FaultDirection::FromCaller, src, dst)
    }

    fn copy_to_caller(&self, src: &[u8], dst: &mut [u8]) -> Result<(), TransferFault> {
        self.attempt(FaultDirection::ToCaller, src, dst)
    }
}
