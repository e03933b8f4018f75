// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Open-file handle on a channel
//!
//! A `Session` is what a host hands to its caller after a successful open. It
//! carries the seek position and the interrupt token of that caller, and
//! releases the channel exactly once (explicit `close` or drop).

use std::fmt;
use std::sync::Arc;

use chan_sync::Interrupter;

use crate::channel::{SessionId, Shared};
use crate::control::ControlOp;
use crate::error::{ChannelError, Result};
use crate::poll::{PollEvents, PollWatcher};

/// Access requested at open time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

impl AccessMode {
    pub const fn can_read(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub const fn can_write(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// Origin of a seek offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Whence {
    Set,
    Cur,
    /// Relative to the number of buffered bytes.
    End,
}

pub struct Session {
    id: SessionId,
    mode: AccessMode,
    position: usize,
    interrupter: Interrupter,
    shared: Arc<Shared>,
    released: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(id: SessionId, mode: AccessMode, shared: Arc<Shared>) -> Self {
        Self { id, mode, position: 0, interrupter: Interrupter::new(), shared, released: false }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Logical position used by the positioned read/write variants.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Token that aborts this session's current or next wait with `Interrupted`.
    pub fn interrupter(&self) -> Interrupter {
        self.interrupter.clone()
    }

    fn writable(&self) -> Result<()> {
        if !self.mode.can_write() {
            return Err(ChannelError::InvalidArgument);
        }
        self.shared.check_owner(self.id)
    }

    fn readable(&self) -> Result<()> {
        if !self.mode.can_read() {
            return Err(ChannelError::InvalidArgument);
        }
        self.shared.check_owner(self.id)
    }

    /// Appends `data`; returns the number of bytes accepted.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.writable()?;
        self.shared.append(data, Some(&self.interrupter), true)
    }

    /// Writes at `offset` bytes past the read cursor, zero filling any gap.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<usize> {
        self.writable()?;
        self.shared.write_at(offset, data, Some(&self.interrupter))
    }

    /// Writes at the seek position and advances it.
    pub fn write_positioned(&mut self, data: &[u8]) -> Result<usize> {
        self.writable()?;
        let written = self.shared.write_at(self.position, data, Some(&self.interrupter))?;
        self.position += written;
        Ok(written)
    }

    /// Consumes up to `max_len` bytes from the read cursor.
    pub fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        self.readable()?;
        self.shared.read(max_len, Some(&self.interrupter))
    }

    /// Copies bytes `offset..` past the read cursor without consuming them.
    pub fn read_at(&self, offset: usize, max_len: usize) -> Result<Vec<u8>> {
        self.readable()?;
        self.shared.read_at(offset, max_len, Some(&self.interrupter))
    }

    /// Non-consuming read at the seek position; advances the position.
    pub fn read_positioned(&mut self, max_len: usize) -> Result<Vec<u8>> {
        self.readable()?;
        let out = self.shared.read_at(self.position, max_len, Some(&self.interrupter))?;
        self.position += out.len();
        Ok(out)
    }

    /// Moves the seek position; the target must stay below the capacity.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<usize> {
        self.shared.check_owner(self.id)?;
        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => self.position,
            Whence::End => self.shared.length(Some(&self.interrupter))?,
        };
        let base = i64::try_from(base).map_err(|_| ChannelError::TooLarge)?;
        let target = base.checked_add(offset).ok_or(ChannelError::InvalidArgument)?;
        if target < 0 {
            return Err(ChannelError::InvalidArgument);
        }
        let target = usize::try_from(target).map_err(|_| ChannelError::TooLarge)?;
        if target >= self.shared.capacity(Some(&self.interrupter))? {
            return Err(ChannelError::TooLarge);
        }
        self.position = target;
        Ok(target)
    }

    /// Executes a control request; `Get` returns the value, others return 0.
    pub fn control(&mut self, op: ControlOp) -> Result<u64> {
        self.shared.check_owner(self.id)?;
        self.shared.control(op, Some(&self.interrupter))
    }

    /// Current readiness, never blocks.
    pub fn poll(&self) -> Result<PollEvents> {
        self.shared.poll(Some(&self.interrupter))
    }

    /// Registers readiness interest on a poll-queue channel.
    pub fn watch(&self) -> Result<PollWatcher> {
        PollWatcher::register(Arc::clone(&self.shared), self.interrupter.clone())
    }

    /// Releases the session now instead of at drop.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.shared.release(self.id);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}
