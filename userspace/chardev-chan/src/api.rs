// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Free-function entry points mirroring the device file operations.

use crate::channel::Channel;
use crate::control::ControlOp;
use crate::error::Result;
use crate::session::{Session, Whence};

pub use crate::channel::create_channel;

pub fn open(channel: &Channel) -> Result<Session> {
    channel.open()
}

/// Appends, or writes at `offset` when one is given.
pub fn write(session: &mut Session, data: &[u8], offset: Option<usize>) -> Result<usize> {
    match offset {
        Some(offset) => session.write_at(offset, data),
        None => session.write(data),
    }
}

pub fn read(session: &mut Session, max_len: usize) -> Result<Vec<u8>> {
    session.read(max_len)
}

pub fn seek(session: &mut Session, offset: i64, whence: Whence) -> Result<usize> {
    session.seek(offset, whence)
}

pub fn control(session: &mut Session, op: ControlOp) -> Result<u64> {
    session.control(op)
}

pub fn close(session: Session) {
    session.close();
}
