//! Blocking channels
//!
//! A bounded FIFO shared between host and script code. Capacity zero is an
//! unbuffered channel: a send completes only once a receiver has taken the
//! value.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::{Condvar, Mutex};

use crate::error::{ReflectError, ReflectResult};
use crate::value::Data;

/// Channel storage shared by all values referring to it
pub struct Channel {
    /// Internal state protected by a mutex
    inner: Mutex<ChannelInner>,
    /// Signalled when buffer space frees up or a value is taken
    not_full: Condvar,
    /// Signalled when a value is queued or the channel closes
    not_empty: Condvar,
}

struct ChannelInner {
    /// Buffer capacity (0 = unbuffered)
    capacity: usize,
    /// Message queue
    queue: VecDeque<Data>,
    /// Whether channel is closed
    closed: bool,
    /// Number of values ever queued
    sent: u64,
    /// Number of values ever taken
    received: u64,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Channel")
            .field("capacity", &inner.capacity)
            .field("length", &inner.queue.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

impl Channel {
    /// Create a new channel with given buffer capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ChannelInner {
                capacity,
                queue: VecDeque::with_capacity(capacity.max(1)),
                closed: false,
                sent: 0,
                received: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    /// Get buffer capacity
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Number of values waiting in the buffer
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.queue.len().min(inner.capacity)
    }

    /// Whether the buffer holds no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if channel is closed
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Send a value, blocking until it is buffered (or, when unbuffered,
    /// taken by a receiver)
    pub fn send(&self, value: Data) -> ReflectResult<()> {
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return Err(ReflectError::ClosedChannel { op: "send on" });
            }
            if inner.queue.len() < inner.capacity.max(1) {
                break;
            }
            self.not_full.wait(&mut inner);
        }
        inner.queue.push_back(value);
        inner.sent += 1;
        let ticket = inner.sent;
        self.not_empty.notify_one();

        if inner.capacity == 0 {
            while inner.received < ticket && !inner.closed {
                self.not_full.wait(&mut inner);
            }
            if inner.received < ticket {
                // closed before a receiver took it: the value is not delivered
                inner.queue.pop_back();
                return Err(ReflectError::ClosedChannel { op: "send on" });
            }
        }
        tracing::trace!(ticket, "channel send completed");
        Ok(())
    }

    /// Receive a value, blocking until one is available
    ///
    /// Returns `None` once the channel is closed and drained. An unbuffered
    /// channel has nothing to drain: a pending sender fails on close.
    pub fn receive(&self) -> Option<Data> {
        let mut inner = self.inner.lock();
        loop {
            if inner.closed && inner.capacity == 0 {
                return None;
            }
            if let Some(value) = inner.queue.pop_front() {
                inner.received += 1;
                self.not_full.notify_all();
                return Some(value);
            }
            if inner.closed {
                return None;
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Close the channel, waking all waiting senders and receivers
    pub fn close(&self) -> ReflectResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(ReflectError::ClosedChannel { op: "close of" });
        }
        inner.closed = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
        Ok(())
    }
}
