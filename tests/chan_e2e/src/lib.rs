//! CONTEXT: chardev-chan end-to-end test harness library
//! INTENT: Multi-threaded producer/consumer checks against real channels
//! DEPS: chardev-chan
//! TESTS: Round trip, overflow policies, exclusive sessions, blocking waits, concurrent records
// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use chardev_chan::{ChannelError, Session};

/// Size of one tagged record; channel capacities in the e2e tests are multiples of it.
pub const RECORD_LEN: usize = 8;

/// `[writer][seq:u32 LE][0x5A][sum][!sum]`
pub fn tagged_record(writer: u8, seq: u32) -> [u8; RECORD_LEN] {
    let s = seq.to_le_bytes();
    let sum = writer.wrapping_add(s.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)));
    [writer, s[0], s[1], s[2], s[3], 0x5A, sum, !sum]
}

/// Decodes one record, `None` when the tag or checksum is off.
pub fn decode_record(rec: &[u8]) -> Option<(u8, u32)> {
    let rec: [u8; RECORD_LEN] = rec.try_into().ok()?;
    let seq = u32::from_le_bytes([rec[1], rec[2], rec[3], rec[4]]);
    (tagged_record(rec[0], seq) == rec).then_some((rec[0], seq))
}

/// Writes a whole record, retrying short writes and transient refusals.
pub fn write_all(session: &mut Session, mut data: &[u8]) -> Result<(), ChannelError> {
    while !data.is_empty() {
        match session.write(data) {
            Ok(n) => data = &data[n..],
            Err(ChannelError::Full | ChannelError::Busy | ChannelError::Timeout) => {
                std::thread::yield_now()
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_decode_and_reject_corruption() {
        let rec = tagged_record(7, 123_456);
        assert_eq!(decode_record(&rec), Some((7, 123_456)));
        let mut bad = rec;
        bad[2] ^= 1;
        assert_eq!(decode_record(&bad), None);
    }
}
