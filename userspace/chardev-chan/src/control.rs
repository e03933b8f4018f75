// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Out-of-band control requests (the ioctl surface).

use std::fmt;
use std::str::FromStr;

use chan_sync::Interrupter;
use log::{debug, info};

use crate::channel::Shared;
use crate::config::OverflowPolicy;
use crate::error::{ChannelError, Result};

/// Channel attribute addressed by `Get`/`Set`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Capacity,
    /// Read-only.
    Length,
    /// Read-only.
    OpenCount,
    Quota,
    TimeoutMs,
    ReadCount,
    WriteCount,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Capacity,
        Field::Length,
        Field::OpenCount,
        Field::Quota,
        Field::TimeoutMs,
        Field::ReadCount,
        Field::WriteCount,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Field::Capacity => "capacity",
            Field::Length => "length",
            Field::OpenCount => "open-count",
            Field::Quota => "quota",
            Field::TimeoutMs => "timeout-ms",
            Field::ReadCount => "read-count",
            Field::WriteCount => "write-count",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .into_iter()
            .find(|field| field.name() == s || field.name().replace('-', "_") == s)
            .ok_or(ChannelError::InvalidArgument)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlOp {
    /// Zero storage, length and cursors.
    Reset,
    Get(Field),
    Set(Field, u64),
    EnableNotify,
    DisableNotify,
}

impl Shared {
    pub(crate) fn control(&self, op: ControlOp, interrupt: Option<&Interrupter>) -> Result<u64> {
        debug!("chardev-chan: control {op:?}");
        self.locked(interrupt, |state, notifier| match op {
            ControlOp::Reset => {
                state.buffer.reset();
                notifier.space_ready();
                notifier.settle(state);
                info!("chardev-chan: reset");
                Ok(0)
            }
            ControlOp::EnableNotify | ControlOp::DisableNotify => {
                state.notify = op == ControlOp::EnableNotify;
                Ok(0)
            }
            ControlOp::Get(field) => Ok(match field {
                Field::Capacity => state.buffer.capacity() as u64,
                Field::Length => state.buffer.len() as u64,
                Field::OpenCount => self.open_count(),
                Field::Quota => state.quota as u64,
                Field::TimeoutMs => self.timeout().as_millis() as u64,
                Field::ReadCount => state.counters.reads,
                Field::WriteCount => state.counters.writes,
            }),
            ControlOp::Set(Field::Length | Field::OpenCount, _) => Err(ChannelError::InvalidArgument),
            ControlOp::Set(Field::Capacity, value) => {
                if self.config.overflow != OverflowPolicy::Reallocate || value == 0 {
                    return Err(ChannelError::InvalidArgument);
                }
                let capacity = usize::try_from(value).map_err(|_| ChannelError::TooLarge)?;
                if capacity > self.config.max_capacity {
                    return Err(ChannelError::TooLarge);
                }
                state.buffer.reallocate(capacity);
                notifier.space_ready();
                notifier.settle(state);
                info!("chardev-chan: capacity set to {capacity}");
                Ok(0)
            }
            ControlOp::Set(Field::Quota, value) => {
                let quota = usize::try_from(value).map_err(|_| ChannelError::InvalidArgument)?;
                if quota > self.config.max_capacity {
                    return Err(ChannelError::InvalidArgument);
                }
                state.quota = quota;
                Ok(0)
            }
            ControlOp::Set(Field::TimeoutMs, ms) => {
                if ms == 0 && self.config.blocking {
                    return Err(ChannelError::InvalidArgument);
                }
                self.set_timeout_ms(ms);
                Ok(0)
            }
            ControlOp::Set(Field::ReadCount, value) => {
                state.counters.reads = value;
                Ok(0)
            }
            ControlOp::Set(Field::WriteCount, value) => {
                state.counters.writes = value;
                Ok(0)
            }
        })
    }
}
