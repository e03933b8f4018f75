//! CONTEXT: chardev-chan multi-producer/multi-consumer correctness
//! INTENT: Tagged records survive concurrent access intact, in per-writer order
//! DEPS: chardev-chan, chan-e2e harness
//! TESTS: K writers x N records against every waiting-capable sync mode
// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use chan_e2e::{decode_record, tagged_record, write_all, RECORD_LEN};
use chardev_chan::{Channel, ChannelConfig, ChannelError, Layout, ReadPolicy, SyncMode};

const WRITERS: u8 = 4;
const READERS: usize = 2;
const RECORDS: u32 = 500;

struct ReaderLog {
    bytes: usize,
    records: Vec<(u8, u32)>,
}

fn run_mixed_load(config: ChannelConfig) -> (usize, Vec<ReaderLog>) {
    let ch = Channel::new(config).unwrap();
    let live = Arc::new(AtomicUsize::new(WRITERS as usize));

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let ch = ch.clone();
            let live = Arc::clone(&live);
            thread::spawn(move || {
                let mut s = ch.open().unwrap();
                for seq in 0..RECORDS {
                    write_all(&mut s, &tagged_record(w, seq)).unwrap();
                }
                live.fetch_sub(1, Ordering::AcqRel);
                RECORDS as usize * RECORD_LEN
            })
        })
        .collect();

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let ch = ch.clone();
            let live = Arc::clone(&live);
            thread::spawn(move || {
                let mut s = ch.open().unwrap();
                let mut log = ReaderLog { bytes: 0, records: Vec::new() };
                loop {
                    let drained = live.load(Ordering::Acquire) == 0;
                    match s.read(ch.config().capacity) {
                        Ok(chunk) if chunk.is_empty() => {
                            if drained {
                                break;
                            }
                            thread::yield_now();
                        }
                        Ok(chunk) => {
                            assert_eq!(chunk.len() % RECORD_LEN, 0, "record split across reads");
                            log.bytes += chunk.len();
                            for rec in chunk.chunks_exact(RECORD_LEN) {
                                log.records.push(decode_record(rec).expect("corrupted record"));
                            }
                        }
                        Err(ChannelError::Busy) => thread::yield_now(),
                        Err(err) => panic!("reader failed: {err}"),
                    }
                }
                log
            })
        })
        .collect();

    let written = writers.into_iter().map(|h| h.join().unwrap()).sum();
    let logs = readers.into_iter().map(|h| h.join().unwrap()).collect();
    (written, logs)
}

fn assert_consistent(mode: SyncMode, written: usize, logs: &[ReaderLog]) {
    let read: usize = logs.iter().map(|log| log.bytes).sum();
    assert!(read <= written, "{mode:?}: read {read} > written {written}");
    assert_eq!(read, written, "{mode:?}: bytes lost");

    let mut seen = HashMap::new();
    for log in logs {
        let mut last: HashMap<u8, u32> = HashMap::new();
        for &(writer, seq) in &log.records {
            if let Some(prev) = last.insert(writer, seq) {
                assert!(seq > prev, "{mode:?}: writer {writer} reordered ({prev} then {seq})");
            }
            *seen.entry(writer).or_insert(0u32) += 1;
        }
    }
    for w in 0..WRITERS {
        assert_eq!(seen.get(&w), Some(&RECORDS), "{mode:?}: writer {w}");
    }
}

#[test]
fn tagged_records_survive_every_locking_mode() {
    for mode in [
        SyncMode::Mutex,
        SyncMode::Spinlock,
        SyncMode::Semaphore,
        SyncMode::Completion,
        SyncMode::PollQueue,
    ] {
        for layout in [Layout::Linear, Layout::Ring] {
            let config = ChannelConfig::new(16 * RECORD_LEN).with_sync(mode).with_layout(layout);
            let (written, logs) = run_mixed_load(config);
            assert_consistent(mode, written, &logs);
        }
    }
}

#[test]
fn blocking_channel_under_load() {
    let config = ChannelConfig::new(8 * RECORD_LEN)
        .with_sync(SyncMode::Completion)
        .with_read_policy(ReadPolicy::Stream)
        .blocking(true);
    let ch = Channel::new(config).unwrap();
    let producer = {
        let ch = ch.clone();
        thread::spawn(move || {
            let mut s = ch.open().unwrap();
            for seq in 0..RECORDS {
                write_all(&mut s, &tagged_record(1, seq)).unwrap();
            }
        })
    };
    let mut s = ch.open().unwrap();
    let mut next = 0u32;
    let mut pending = Vec::new();
    while next < RECORDS {
        pending.extend(s.read(3 * RECORD_LEN).unwrap());
        while pending.len() >= RECORD_LEN {
            let rec: Vec<u8> = pending.drain(..RECORD_LEN).collect();
            assert_eq!(decode_record(&rec), Some((1, next)));
            next += 1;
        }
    }
    producer.join().unwrap();
    assert_eq!(ch.stats().unwrap().length, 0);
}

#[test]
fn unsynchronized_channel_refuses_overlap_instead_of_racing() {
    let ch = Channel::new(ChannelConfig::new(64).with_sync(SyncMode::None)).unwrap();
    let workers: Vec<_> = (0..4u8)
        .map(|w| {
            let ch = ch.clone();
            thread::spawn(move || {
                let mut s = ch.open().unwrap();
                let mut refused = 0usize;
                for seq in 0..200 {
                    match s.write(&tagged_record(w, seq)) {
                        Ok(_) | Err(ChannelError::Full) => {}
                        Err(ChannelError::Busy) => refused += 1,
                        Err(err) => panic!("unexpected {err}"),
                    }
                    let _ = s.read(64);
                }
                refused
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    let stats = ch.stats().unwrap();
    assert!(stats.length <= 64);
    assert_eq!(stats.length % RECORD_LEN, 0);
}
