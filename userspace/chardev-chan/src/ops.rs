// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Capability traits a host dispatches file operations through.

use crate::control::ControlOp;
use crate::error::Result;
use crate::session::{Session, Whence};

pub trait Readable {
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>>;
}

pub trait Writable {
    fn write(&mut self, data: &[u8]) -> Result<usize>;
    fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<usize>;
}

pub trait Controllable {
    fn control(&mut self, op: ControlOp) -> Result<u64>;
    fn seek(&mut self, offset: i64, whence: Whence) -> Result<usize>;
}

impl Readable for Session {
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        Session::read(self, max_len)
    }
}

impl Writable for Session {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Session::write(self, data)
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<usize> {
        Session::write_at(self, offset, data)
    }
}

impl Controllable for Session {
    fn control(&mut self, op: ControlOp) -> Result<u64> {
        Session::control(self, op)
    }

    fn seek(&mut self, offset: i64, whence: Whence) -> Result<usize> {
        Session::seek(self, offset, whence)
    }
}
