//! CONTEXT: chardev-chan blocking behaviour end-to-end
//! INTENT: Timeouts, interruption, wake-ups from writers and event sources, poll watchers
//! DEPS: chardev-chan
//! TESTS: completion/poll-queue waits across threads
// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chardev_chan::{
    Channel, ChannelConfig, ChannelError, EventSource, IntervalSource, Layout, PollEvents,
    ReadPolicy, SyncMode, WakePolicy,
};

fn blocking(mode: SyncMode, capacity: usize, timeout: Duration) -> Channel {
    Channel::new(ChannelConfig::new(capacity).with_sync(mode).blocking(true).with_timeout(timeout))
        .unwrap()
}

#[test]
fn completion_read_times_out_after_budget() {
    let ch = blocking(SyncMode::Completion, 16, Duration::from_millis(100));
    let mut s = ch.open().unwrap();
    let started = Instant::now();
    assert_eq!(s.read(16), Err(ChannelError::Timeout));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(100), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(150), "overslept: {elapsed:?}");
}

#[test]
fn poll_queue_read_times_out_after_budget() {
    let ch = blocking(SyncMode::PollQueue, 16, Duration::from_millis(100));
    let mut s = ch.open().unwrap();
    let started = Instant::now();
    assert_eq!(s.read(16), Err(ChannelError::Timeout));
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[test]
fn interrupted_reader_returns_promptly() {
    for mode in [SyncMode::Completion, SyncMode::PollQueue] {
        let ch = blocking(mode, 16, Duration::from_secs(10));
        let mut s = ch.open().unwrap();
        let token = s.interrupter();
        let started = Instant::now();
        let reader = thread::spawn(move || s.read(16));
        thread::sleep(Duration::from_millis(30));
        token.raise();
        assert_eq!(reader.join().unwrap(), Err(ChannelError::Interrupted), "{mode:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

#[test]
fn blocked_reader_wakes_on_write() {
    for mode in [SyncMode::Completion, SyncMode::PollQueue] {
        let ch = blocking(mode, 16, Duration::from_secs(5));
        let mut reader = ch.open().unwrap();
        let handle = thread::spawn(move || reader.read(16));
        thread::sleep(Duration::from_millis(20));
        let mut writer = ch.open().unwrap();
        writer.write(b"wake").unwrap();
        assert_eq!(handle.join().unwrap().unwrap(), b"wake", "{mode:?}");
    }
}

#[test]
fn blocked_writer_resumes_when_reader_drains() {
    for mode in [SyncMode::Completion, SyncMode::PollQueue] {
        let ch = blocking(mode, 4, Duration::from_secs(5));
        let mut writer = ch.open().unwrap();
        writer.write(b"full").unwrap();
        let handle = thread::spawn(move || writer.write(b"more"));
        thread::sleep(Duration::from_millis(20));
        let mut reader = ch.open().unwrap();
        assert_eq!(reader.read(4).unwrap(), b"full");
        assert_eq!(handle.join().unwrap(), Ok(4), "{mode:?}");
        assert_eq!(reader.read(4).unwrap(), b"more");
    }
}

fn stream_completion(layout: Layout, capacity: usize, timeout: Duration) -> Channel {
    Channel::new(
        ChannelConfig::new(capacity)
            .with_sync(SyncMode::Completion)
            .with_layout(layout)
            .with_read_policy(ReadPolicy::Stream)
            .blocking(true)
            .with_timeout(timeout),
    )
    .unwrap()
}

#[test]
fn wake_one_hands_leftover_data_to_next_reader() {
    let ch = stream_completion(Layout::Linear, 16, Duration::from_millis(400));
    let readers: Vec<_> = (0..2)
        .map(|_| {
            let mut s = ch.open().unwrap();
            thread::spawn(move || s.read(1))
        })
        .collect();
    thread::sleep(Duration::from_millis(30));
    let mut writer = ch.open().unwrap();
    writer.write(b"xy").unwrap();
    let mut got: Vec<u8> = readers.into_iter().flat_map(|r| r.join().unwrap().unwrap()).collect();
    got.sort_unstable();
    assert_eq!(got, b"xy");
    assert_eq!(ch.stats().unwrap().length, 0);
}

#[test]
fn wake_one_hands_leftover_space_to_next_writer() {
    let ch = stream_completion(Layout::Ring, 4, Duration::from_millis(400));
    let mut reader = ch.open().unwrap();
    reader.write(b"abcd").unwrap();
    let writers: Vec<_> = (0..2)
        .map(|_| {
            let mut s = ch.open().unwrap();
            thread::spawn(move || s.write(b"z"))
        })
        .collect();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(reader.read(2).unwrap(), b"ab");
    for writer in writers {
        assert_eq!(writer.join().unwrap(), Ok(1));
    }
    assert_eq!(reader.read(4).unwrap(), b"cdzz");
}

#[test]
fn wake_all_releases_every_reader() {
    for mode in [SyncMode::Completion, SyncMode::PollQueue] {
        let ch = Channel::new(
            ChannelConfig::new(16)
                .with_sync(mode)
                .with_wake(WakePolicy::All)
                .with_read_policy(ReadPolicy::Stream)
                .blocking(true)
                .with_timeout(Duration::from_secs(5)),
        )
        .unwrap();
        let finished = Arc::new(AtomicBool::new(false));
        let readers: Vec<_> = (0..3)
            .map(|_| {
                let mut s = ch.open().unwrap();
                thread::spawn(move || s.read(1))
            })
            .collect();
        let feeder = {
            let ch = ch.clone();
            let finished = Arc::clone(&finished);
            thread::spawn(move || {
                let mut s = ch.open().unwrap();
                while !finished.load(Ordering::Acquire) {
                    let _ = s.write(b"x");
                    thread::sleep(Duration::from_millis(10));
                }
            })
        };
        for reader in readers {
            assert_eq!(reader.join().unwrap().unwrap(), b"x", "{mode:?}");
        }
        finished.store(true, Ordering::Release);
        feeder.join().unwrap();
    }
}

#[test]
fn external_notify_is_spurious_safe() {
    let ch = blocking(SyncMode::Completion, 16, Duration::from_millis(150));
    let mut s = ch.open().unwrap();
    let notifier = ch.clone();
    let kick = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        notifier.notify().unwrap();
    });
    // A wake-up without data must not surface as an empty read.
    assert_eq!(s.read(16), Err(ChannelError::Timeout));
    kick.join().unwrap();
}

#[test]
fn interval_source_feeds_blocking_reader() {
    let ch = Channel::new(
        ChannelConfig::new(64)
            .with_sync(SyncMode::PollQueue)
            .with_read_policy(ReadPolicy::Stream)
            .blocking(true)
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap();
    let mut reader = ch.open().unwrap();
    let source = IntervalSource::new(Duration::from_millis(5), *b"tick").start(ch.clone());
    let mut received = Vec::new();
    while received.len() < 12 {
        received.extend(reader.read(4).unwrap());
    }
    let delivered = source.stop();
    assert!(delivered >= 3);
    assert!(received.chunks(4).all(|chunk| chunk == b"tick"), "{received:?}");
}

#[test]
fn poll_watcher_reports_readiness_change() {
    let ch = Channel::new(ChannelConfig::new(8).with_sync(SyncMode::PollQueue)).unwrap();
    let session = ch.open().unwrap();
    let mut watcher = session.watch().unwrap();
    assert_eq!(session.poll(), Ok(PollEvents::WRITABLE));
    assert_eq!(
        watcher.wait(PollEvents::READABLE, Duration::from_millis(20)),
        Err(ChannelError::Timeout)
    );
    let producer = ch.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        producer.deliver(b"data").unwrap();
    });
    let events = watcher.wait(PollEvents::READABLE, Duration::from_secs(5)).unwrap();
    assert!(events.contains(PollEvents::READABLE | PollEvents::WRITABLE));
}
