//! CONTEXT: chardev-chan single-threaded end-to-end behaviour
//! INTENT: Round trip, partial reads, full rejection, exclusive sessions, transfer faults
//! DEPS: chardev-chan
//! TESTS: write/read/seek/control through sessions, traits and free functions
// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use chardev_chan::api;
use chardev_chan::{
    create_channel, AccessMode, Channel, ChannelConfig, ChannelError, ControlOp, FaultDirection,
    FaultyTransfer, Field, Layout, OverflowPolicy, ReadPolicy, SessionPolicy, SessionState,
    SyncMode, Whence,
};
use proptest::prelude::*;

const ALL_MODES: [SyncMode; 6] = [
    SyncMode::None,
    SyncMode::Mutex,
    SyncMode::Semaphore,
    SyncMode::Completion,
    SyncMode::Spinlock,
    SyncMode::PollQueue,
];

#[test]
fn roundtrip_in_every_sync_mode() {
    for mode in ALL_MODES {
        for layout in [Layout::Linear, Layout::Ring] {
            let ch = Channel::new(ChannelConfig::new(32).with_sync(mode).with_layout(layout)).unwrap();
            let mut s = ch.open().unwrap();
            let payload = b"the quick brown fox";
            assert_eq!(s.write(payload), Ok(payload.len()), "{mode:?}/{layout:?}");
            assert_eq!(s.read(payload.len()).unwrap(), payload, "{mode:?}/{layout:?}");
        }
    }
}

#[test]
fn partial_read_clear_on_read_discards_rest() {
    let ch = Channel::new(ChannelConfig::new(64)).unwrap();
    let mut s = ch.open().unwrap();
    s.write(&[b'x'; 10]).unwrap();
    assert_eq!(s.read(4).unwrap(), vec![b'x'; 4]);
    assert_eq!(ch.stats().unwrap().length, 0);
}

#[test]
fn partial_read_stream_keeps_rest() {
    let ch = Channel::new(ChannelConfig::new(64).with_read_policy(ReadPolicy::Stream)).unwrap();
    let mut s = ch.open().unwrap();
    s.write(b"0123456789").unwrap();
    assert_eq!(s.read(4).unwrap(), b"0123");
    assert_eq!(ch.stats().unwrap().length, 6);
    assert_eq!(s.read(64).unwrap(), b"456789");
}

#[test]
fn ring_layout_wraps_under_stream_reads() {
    let ch = Channel::new(
        ChannelConfig::new(8).with_layout(Layout::Ring).with_read_policy(ReadPolicy::Stream),
    )
    .unwrap();
    let mut s = ch.open().unwrap();
    s.write(b"abcdef").unwrap();
    assert_eq!(s.read(4).unwrap(), b"abcd");
    assert_eq!(s.write(b"ghijkl"), Ok(6));
    assert_eq!(s.write(b"m"), Err(ChannelError::Full));
    assert_eq!(s.read(8).unwrap(), b"efghijkl");
}

#[test]
fn full_channel_rejects_any_write() {
    let ch = Channel::new(ChannelConfig::new(16)).unwrap();
    let mut s = ch.open().unwrap();
    s.write(&[1u8; 16]).unwrap();
    for len in 1..=20 {
        assert_eq!(s.write(&vec![2u8; len]), Err(ChannelError::Full));
    }
    assert_eq!(ch.stats().unwrap().length, 16);
    assert_eq!(ChannelError::Full.errno(), -28);
}

#[test]
fn exclusive_session_lifecycle() {
    let ch = create_channel(16, SyncMode::Mutex, SessionPolicy::Exclusive).unwrap();
    let mut owner = api::open(&ch).unwrap();
    assert_eq!(api::open(&ch).map(|_| ()), Err(ChannelError::Busy));
    api::write(&mut owner, b"mine", None).unwrap();
    api::close(owner);
    assert_eq!(ch.session_state(), SessionState::Idle);

    let mut next = ch.open_with(AccessMode::ReadOnly).unwrap();
    assert_eq!(next.read(16).unwrap(), b"mine");
    assert_eq!(next.control(ControlOp::Get(Field::OpenCount)), Ok(2));
}

#[test]
fn shared_sessions_see_each_other() {
    let ch = Channel::new(ChannelConfig::new(16).with_read_policy(ReadPolicy::Stream)).unwrap();
    let mut a = ch.open().unwrap();
    let mut b = ch.open().unwrap();
    a.write(b"from-a").unwrap();
    assert_eq!(b.read(4).unwrap(), b"from");
    assert_eq!(a.read(4).unwrap(), b"-a");
    assert_eq!(ch.stats().unwrap().active_sessions, 2);
}

#[test]
fn offset_write_zero_fills_and_seek_bounds() {
    let ch = Channel::new(ChannelConfig::new(16).with_read_policy(ReadPolicy::Stream)).unwrap();
    let mut s = ch.open().unwrap();
    assert_eq!(api::write(&mut s, b"ab", Some(3)), Ok(2));
    assert_eq!(s.read_at(0, 16).unwrap(), b"\0\0\0ab");
    assert_eq!(api::write(&mut s, b"x", Some(16)), Err(ChannelError::TooLarge));
    assert_eq!(api::seek(&mut s, -1, Whence::Set), Err(ChannelError::InvalidArgument));
    assert_eq!(api::seek(&mut s, 0, Whence::End), Ok(5));
    assert_eq!(api::seek(&mut s, 11, Whence::Cur), Err(ChannelError::TooLarge));
}

#[test]
fn truncating_overflow_keeps_prefix() {
    let ch = Channel::new(ChannelConfig::new(4).with_overflow(OverflowPolicy::Truncate)).unwrap();
    let mut s = ch.open().unwrap();
    assert_eq!(s.write(b"abcdefgh"), Ok(8));
    assert_eq!(s.read(16).unwrap(), b"abcd");
}

#[test]
fn transfer_fault_leaves_channel_unchanged() {
    let faulty = Arc::new(FaultyTransfer::after(2, FaultDirection::Both));
    let ch = Channel::with_transfer(
        ChannelConfig::new(16).with_read_policy(ReadPolicy::Stream),
        faulty.clone(),
    )
    .unwrap();
    let mut s = ch.open().unwrap();
    s.write(b"keep").unwrap();
    assert_eq!(s.read(2).unwrap(), b"ke");
    let before = ch.stats().unwrap();

    assert_eq!(s.write(b"lost"), Err(ChannelError::TransferFault));
    assert_eq!(s.read(2), Err(ChannelError::TransferFault));

    let after = ch.stats().unwrap();
    assert_eq!(after.length, before.length);
    assert_eq!(after.bytes_written, before.bytes_written);
    assert_eq!(after.faults, 2);
    assert_eq!(faulty.faults(), 2);
}

#[test]
fn config_round_trips_through_toml() {
    let text = r#"
        capacity = 256
        layout = "ring"
        read_policy = "stream"
        sync = "poll-queue"
        blocking = true
        timeout_ms = 50
    "#;
    let config = ChannelConfig::from_toml_str(text).unwrap();
    let ch = Channel::new(config.clone()).unwrap();
    assert_eq!(ch.sync_mode(), SyncMode::PollQueue);
    assert_eq!(ChannelConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap(), config);
    assert!(ChannelConfig::from_toml_str("blocking = true").is_err());
}

#[derive(Clone, Debug)]
enum Step {
    Write(Vec<u8>),
    WriteAt(usize, Vec<u8>),
    Read(usize),
    Reset,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..40).prop_map(Step::Write),
        (0usize..40, prop::collection::vec(any::<u8>(), 0..12)).prop_map(|(o, d)| Step::WriteAt(o, d)),
        (0usize..40).prop_map(Step::Read),
        Just(Step::Reset),
    ]
}

proptest! {
    #[test]
    fn length_stays_within_capacity(
        steps in prop::collection::vec(step(), 1..64),
        ring in any::<bool>(),
        stream in any::<bool>(),
    ) {
        let config = ChannelConfig::new(24)
            .with_layout(if ring { Layout::Ring } else { Layout::Linear })
            .with_read_policy(if stream { ReadPolicy::Stream } else { ReadPolicy::ClearOnRead });
        let ch = Channel::new(config).unwrap();
        let mut s = ch.open().unwrap();
        for step in steps {
            let _ = match step {
                Step::Write(d) => s.write(&d).map(drop),
                Step::WriteAt(o, d) => s.write_at(o, &d).map(drop),
                Step::Read(n) => s.read(n).map(drop),
                Step::Reset => s.control(ControlOp::Reset).map(drop),
            };
            let stats = ch.stats().unwrap();
            prop_assert!(stats.length <= stats.capacity);
            prop_assert_eq!(stats.capacity, 24);
        }
    }
}
