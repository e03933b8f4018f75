// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! External event sources feeding a channel from outside any session.
//!
//! A source plays the role of a device interrupt: it pushes bytes through
//! [`Channel::deliver`], which wakes blocked readers.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};

use crate::channel::Channel;

/// Producer that runs independently of sessions once started.
pub trait EventSource {
    fn start(self, channel: Channel) -> EventHandle;
}

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    cv: Condvar,
}

impl StopSignal {
    fn raise(&self) {
        *self.stopped.lock() = true;
        self.cv.notify_all();
    }

    /// Sleeps until `until` or a stop request; `true` when stopped.
    fn sleep_until(&self, until: Instant) -> bool {
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.cv.wait_until(&mut stopped, until).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// Running source; stops it on `stop` or drop.
pub struct EventHandle {
    stop: Arc<StopSignal>,
    worker: Option<JoinHandle<u64>>,
}

impl EventHandle {
    /// Stops the source and returns how many deliveries succeeded.
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.stop.raise();
        match self.worker.take().map(JoinHandle::join) {
            Some(Ok(delivered)) => delivered,
            Some(Err(_)) => {
                warn!("chardev-chan: event source thread panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for EventHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Delivers a fixed payload every `period`, like a periodic device interrupt.
#[derive(Clone, Debug)]
pub struct IntervalSource {
    period: Duration,
    payload: Vec<u8>,
    limit: Option<u64>,
}

impl IntervalSource {
    pub fn new(period: Duration, payload: impl Into<Vec<u8>>) -> Self {
        Self { period, payload: payload.into(), limit: None }
    }

    /// Stops on its own after `count` delivery attempts.
    pub fn with_limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }
}

impl EventSource for IntervalSource {
    fn start(self, channel: Channel) -> EventHandle {
        let stop = Arc::new(StopSignal::default());
        let signal = Arc::clone(&stop);
        info!("chardev-chan: interval source every {:?}", self.period);
        let worker = thread::spawn(move || {
            let mut delivered = 0u64;
            let mut attempts = 0u64;
            let mut next = Instant::now() + self.period;
            while !signal.sleep_until(next) {
                next += self.period;
                attempts += 1;
                match channel.deliver(&self.payload) {
                    Ok(_) => delivered += 1,
                    Err(err) => debug!("chardev-chan: interval delivery dropped: {err}"),
                }
                if self.limit.is_some_and(|limit| attempts >= limit) {
                    break;
                }
            }
            delivered
        });
        EventHandle { stop, worker: Some(worker) }
    }
}
