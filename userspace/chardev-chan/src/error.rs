// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use chan_sync::WaitError;

/// Result alias for channel operations.
pub type Result<T> = core::result::Result<T, ChannelError>;

/// Errors returned by channel operations. None of them poisons the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// No room left for an append.
    #[error("channel full")]
    Full,
    /// Nothing to read and the channel reports empty reads as errors.
    #[error("channel empty")]
    Empty,
    /// The request can never fit within the configured bounds.
    #[error("request exceeds channel bounds")]
    TooLarge,
    /// Another session owns the channel, or the channel is being accessed concurrently
    /// without synchronization.
    #[error("channel busy")]
    Busy,
    /// A blocking wait ran out of budget.
    #[error("operation timed out")]
    Timeout,
    /// A blocking wait was interrupted.
    #[error("operation interrupted")]
    Interrupted,
    /// Copying bytes to or from the caller failed.
    #[error("transfer to or from caller memory failed")]
    TransferFault,
    /// The request is malformed for this channel or session.
    #[error("invalid argument")]
    InvalidArgument,
}

const ENOSPC: i32 = 28;
const ENODATA: i32 = 61;
const EFBIG: i32 = 27;
const EBUSY: i32 = 16;
const ETIMEDOUT: i32 = 110;
const EINTR: i32 = 4;
const EFAULT: i32 = 14;
const EINVAL: i32 = 22;

impl ChannelError {
    /// Negative errno for hosts that report a numeric status.
    pub const fn errno(self) -> i32 {
        -match self {
            Self::Full => ENOSPC,
            Self::Empty => ENODATA,
            Self::TooLarge => EFBIG,
            Self::Busy => EBUSY,
            Self::Timeout => ETIMEDOUT,
            Self::Interrupted => EINTR,
            Self::TransferFault => EFAULT,
            Self::InvalidArgument => EINVAL,
        }
    }

    /// `true` when retrying the same request later may succeed.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Full | Self::Empty | Self::Busy | Self::Timeout | Self::Interrupted)
    }
}

impl From<WaitError> for ChannelError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::TimedOut => Self::Timeout,
            WaitError::Interrupted => Self::Interrupted,
        }
    }
}
