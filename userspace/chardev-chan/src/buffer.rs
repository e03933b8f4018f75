// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Fixed-capacity byte storage with linear or ring cursors
//!
//! INVARIANTS:
//!   - `len <= capacity`
//!   - Ring: `(write - read) mod capacity == len mod capacity`
//!   - Linear: `read + len == write <= capacity`
//!   - Cursors return to 0 whenever the buffer drains
//!
//! The buffer knows nothing about locking, waiting or caller memory; the
//! channel stages transfers before calling in, so every method here either
//! applies fully or not at all.

use crate::config::{Layout, ReadPolicy};
use crate::error::{ChannelError, Result};

pub struct ChannelBuffer {
    storage: Box<[u8]>,
    len: usize,
    read: usize,
    write: usize,
    layout: Layout,
}

impl ChannelBuffer {
    pub fn new(capacity: usize, layout: Layout) -> Self {
        Self { storage: vec![0u8; capacity.max(1)].into_boxed_slice(), len: 0, read: 0, write: 0, layout }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[cfg(test)]
    pub fn read_cursor(&self) -> usize {
        self.read
    }

    #[cfg(test)]
    pub fn write_cursor(&self) -> usize {
        self.write
    }

    /// Bytes an append can take right now.
    pub fn free_space(&self) -> usize {
        match self.layout {
            Layout::Ring => self.capacity() - self.len,
            Layout::Linear => self.capacity() - self.write,
        }
    }

    /// Appends as much of `data` as fits; returns the count taken.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.free_space());
        if n == 0 {
            return 0;
        }
        let cap = self.capacity();
        match self.layout {
            Layout::Linear => {
                self.storage[self.write..self.write + n].copy_from_slice(&data[..n]);
                self.write += n;
            }
            Layout::Ring => {
                self.copy_in_wrapping(self.write, &data[..n]);
                self.write = (self.write + n) % cap;
            }
        }
        self.len += n;
        n
    }

    /// Drops the current contents and stores the first `capacity` bytes of `data`.
    pub fn replace(&mut self, data: &[u8]) -> usize {
        self.clear();
        self.append(data)
    }

    /// Writes `data` at logical `offset` from the read cursor.
    ///
    /// A gap between the current end and `offset` is zero-filled. Fails with
    /// `TooLarge` when `offset + data.len()` exceeds capacity.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<usize> {
        let cap = self.capacity();
        let end = offset.checked_add(data.len()).ok_or(ChannelError::TooLarge)?;
        if end > cap {
            return Err(ChannelError::TooLarge);
        }
        if data.is_empty() {
            return Ok(0);
        }
        if self.layout == Layout::Linear && self.read + end > cap {
            self.compact();
        }
        if offset > self.len {
            let gap = offset - self.len;
            self.fill_zero_at(self.len, gap);
        }
        match self.layout {
            Layout::Linear => {
                let at = self.read + offset;
                self.storage[at..at + data.len()].copy_from_slice(data);
            }
            Layout::Ring => self.copy_in_wrapping((self.read + offset) % cap, data),
        }
        self.len = self.len.max(end);
        self.write = match self.layout {
            Layout::Linear => self.read + self.len,
            Layout::Ring => (self.read + self.len) % cap,
        };
        Ok(data.len())
    }

    /// Copies up to `max` bytes from the read cursor without consuming them.
    pub fn peek(&self, max: usize) -> Vec<u8> {
        self.peek_at(0, max)
    }

    /// Copies up to `max` bytes starting `offset` bytes past the read cursor.
    pub fn peek_at(&self, offset: usize, max: usize) -> Vec<u8> {
        if offset >= self.len {
            return Vec::new();
        }
        let n = max.min(self.len - offset);
        let mut out = vec![0u8; n];
        let cap = self.capacity();
        let start = match self.layout {
            Layout::Linear => self.read + offset,
            Layout::Ring => (self.read + offset) % cap,
        };
        let first = n.min(cap - start);
        out[..first].copy_from_slice(&self.storage[start..start + first]);
        out[first..].copy_from_slice(&self.storage[..n - first]);
        out
    }

    /// Retires `n` bytes that a read returned.
    pub fn consume(&mut self, n: usize, policy: ReadPolicy) {
        match policy {
            ReadPolicy::ClearOnRead => self.clear(),
            ReadPolicy::Stream => {
                let n = n.min(self.len);
                self.len -= n;
                if self.len == 0 {
                    self.read = 0;
                    self.write = 0;
                } else {
                    self.read = match self.layout {
                        Layout::Linear => self.read + n,
                        Layout::Ring => (self.read + n) % self.capacity(),
                    };
                }
            }
        }
    }

    /// Forgets the contents; the bytes stay in storage until overwritten.
    pub fn clear(&mut self) {
        self.len = 0;
        self.read = 0;
        self.write = 0;
    }

    /// Clears and zeroes the whole storage.
    pub fn reset(&mut self) {
        self.clear();
        self.storage.fill(0);
    }

    /// Swaps in fresh zeroed storage of `capacity` bytes. Buffered data is lost.
    pub fn reallocate(&mut self, capacity: usize) {
        self.storage = vec![0u8; capacity.max(1)].into_boxed_slice();
        self.clear();
    }

    /// Moves the live bytes of a linear buffer to offset 0.
    fn compact(&mut self) {
        if self.read == 0 {
            return;
        }
        self.storage.copy_within(self.read..self.read + self.len, 0);
        self.read = 0;
        self.write = self.len;
    }

    fn copy_in_wrapping(&mut self, at: usize, data: &[u8]) {
        let cap = self.capacity();
        let first = data.len().min(cap - at);
        self.storage[at..at + first].copy_from_slice(&data[..first]);
        self.storage[..data.len() - first].copy_from_slice(&data[first..]);
    }

    fn fill_zero_at(&mut self, logical: usize, count: usize) {
        let cap = self.capacity();
        for i in 0..count {
            let at = match self.layout {
                Layout::Linear => self.read + logical + i,
                Layout::Ring => (self.read + logical + i) % cap,
            };
            self.storage[at] = 0;
        }
    }

    #[cfg(test)]
    pub(crate) fn invariants_hold(&self) -> bool {
        let cap = self.capacity();
        if self.len > cap {
            return false;
        }
        match self.layout {
            Layout::Ring => (self.write + cap - self.read) % cap == self.len % cap,
            Layout::Linear => self.read + self.len == self.write && self.write <= cap,
        }
    }
}
