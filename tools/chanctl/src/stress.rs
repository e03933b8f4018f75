// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Concurrent writer/reader load against one channel.
//!
//! Writers emit fixed 8-byte records `[writer:u16][seq:u32][check:u16]`;
//! readers drain until every writer finished and the channel is empty.
//! A record is only ever submitted whole: a short write tears it and the
//! tail is never resent, so fragments of two writers cannot interleave.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use anyhow::Context;
use chardev_chan::{Channel, ChannelError, ChannelStats};
use log::{debug, info, warn};

pub const RECORD_LEN: usize = 8;

pub fn encode_record(writer: u16, seq: u32) -> [u8; RECORD_LEN] {
    let mut rec = [0u8; RECORD_LEN];
    rec[..2].copy_from_slice(&writer.to_le_bytes());
    rec[2..6].copy_from_slice(&seq.to_le_bytes());
    rec[6..].copy_from_slice(&check(writer, seq).to_le_bytes());
    rec
}

fn check(writer: u16, seq: u32) -> u16 {
    writer ^ (seq as u16) ^ ((seq >> 16) as u16) ^ 0xA5A5
}

/// `true` when `rec` carries a consistent checksum.
pub fn record_valid(rec: &[u8]) -> bool {
    let Ok(rec) = <[u8; RECORD_LEN]>::try_from(rec) else {
        return false;
    };
    let writer = u16::from_le_bytes([rec[0], rec[1]]);
    let seq = u32::from_le_bytes([rec[2], rec[3], rec[4], rec[5]]);
    u16::from_le_bytes([rec[6], rec[7]]) == check(writer, seq)
}

/// Counts `(valid, invalid)` records in one read chunk.
///
/// A trailing fragment shorter than a record counts as one invalid record.
pub fn tally(chunk: &[u8]) -> (u64, u64) {
    let records = chunk.chunks_exact(RECORD_LEN);
    let torn = u64::from(!records.remainder().is_empty());
    records.fold((0, torn), |(valid, invalid), rec| {
        if record_valid(rec) {
            (valid + 1, invalid)
        } else {
            (valid, invalid + 1)
        }
    })
}

#[derive(Debug, Default)]
pub struct StressReport {
    pub records_written: u64,
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub valid_records: u64,
    pub invalid_records: u64,
    /// Records the channel accepted only partially.
    pub torn_records: u64,
    pub stats: ChannelStats,
}

impl StressReport {
    /// Every record written came back intact exactly once.
    pub fn is_clean(&self) -> bool {
        self.invalid_records == 0 && self.torn_records == 0 && self.valid_records == self.records_written
    }
}

pub fn run(channel: &Channel, writers: usize, readers: usize, records: u32) -> anyhow::Result<StressReport> {
    let started = Instant::now();
    let live_writers = AtomicUsize::new(writers);
    let mut report = StressReport::default();

    thread::scope(|scope| -> anyhow::Result<()> {
        let mut writer_handles = Vec::with_capacity(writers);
        for w in 0..writers {
            let live = &live_writers;
            writer_handles.push(scope.spawn(move || -> anyhow::Result<(u64, u64, u64)> {
                let mut session = channel.open().context("writer open")?;
                let id = u16::try_from(w).context("too many writers")?;
                let (mut accepted, mut torn, mut bytes) = (0u64, 0u64, 0u64);
                for seq in 0..records {
                    let rec = encode_record(id, seq);
                    loop {
                        match session.write(&rec) {
                            Ok(n) => {
                                bytes += n.min(RECORD_LEN) as u64;
                                if n >= RECORD_LEN {
                                    accepted += 1;
                                } else {
                                    torn += 1;
                                    warn!("writer {w}: record {seq} torn after {n} bytes");
                                }
                                break;
                            }
                            Err(err) if err.is_transient() => thread::yield_now(),
                            Err(err) => {
                                live.fetch_sub(1, Ordering::AcqRel);
                                return Err(err).context("writer");
                            }
                        }
                    }
                }
                live.fetch_sub(1, Ordering::AcqRel);
                debug!("writer {w} done");
                Ok((accepted, torn, bytes))
            }));
        }

        let mut reader_handles = Vec::with_capacity(readers);
        for r in 0..readers {
            let live = &live_writers;
            reader_handles.push(scope.spawn(move || -> anyhow::Result<(u64, u64, u64)> {
                let mut session = channel.open().context("reader open")?;
                let (mut bytes, mut valid, mut invalid) = (0u64, 0u64, 0u64);
                loop {
                    let done = live.load(Ordering::Acquire) == 0;
                    match session.read(channel.config().capacity) {
                        Ok(chunk) if chunk.is_empty() => {
                            if done {
                                break;
                            }
                            thread::yield_now();
                        }
                        Ok(chunk) => {
                            bytes += chunk.len() as u64;
                            let (ok, bad) = tally(&chunk);
                            valid += ok;
                            invalid += bad;
                        }
                        Err(err) if err.is_transient() => {
                            if done && err != ChannelError::Busy {
                                break;
                            }
                            thread::yield_now();
                        }
                        Err(err) => return Err(err).context("reader"),
                    }
                }
                debug!("reader {r} done");
                Ok((bytes, valid, invalid))
            }));
        }

        for handle in writer_handles {
            let (accepted, torn, bytes) = handle.join().map_err(|_| anyhow::anyhow!("writer panicked"))??;
            report.records_written += accepted;
            report.torn_records += torn;
            report.bytes_written += bytes;
        }
        for handle in reader_handles {
            let (bytes, valid, invalid) = handle.join().map_err(|_| anyhow::anyhow!("reader panicked"))??;
            report.bytes_read += bytes;
            report.valid_records += valid;
            report.invalid_records += invalid;
        }
        Ok(())
    })?;

    report.stats = channel.stats()?;
    info!(
        "stress finished in {:?}: {} records, {} bytes read",
        started.elapsed(),
        report.records_written,
        report.bytes_read
    );
    Ok(report)
}
