/*! Bounded sample queue between the modulator and the radio.

The producer thread pushes finished baseband samples; the radio side
pops them from its own thread. The queue is bounded so a fast
modulator cannot run away from the radio, and the pop side never
blocks: the radio callback runs in a realtime-sensitive context and
must return in bounded time even when the producer stalls. What to
substitute on underflow is the consumer's decision (see
[`crate::iq_sink`]); the queue just counts the events.
 */
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::{CancellationToken, Complex};

/// Result of a non-blocking pop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pop {
    /// A sample, in production order.
    Sample(Complex),
    /// Queue is empty but the producer is still running.
    Empty,
    /// Queue is empty and closed; no more samples will ever come.
    Closed,
}

struct Inner {
    buf: VecDeque<Complex>,
    closed: bool,
}

/// Bounded FIFO of baseband samples with a blocking producer side
/// and a non-blocking consumer side.
pub struct SampleQueue {
    inner: Mutex<Inner>,
    not_full: Condvar,
    capacity: usize,
    underflows: AtomicU64,
}

impl SampleQueue {
    /// Create a queue holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_full: Condvar::new(),
            capacity,
            underflows: AtomicU64::new(0),
        }
    }

    /// Maximum number of queued samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of queued samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().buf.len()
    }

    /// Whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push samples in order, blocking while the queue is full.
    ///
    /// Returns false if the queue was closed or the token cancelled
    /// before everything was accepted.
    pub fn push_slice(&self, samples: &[Complex], cancel: &CancellationToken) -> bool {
        let mut remaining = samples;
        let mut inner = self.inner.lock().unwrap();
        while !remaining.is_empty() {
            if inner.closed || cancel.is_canceled() {
                return false;
            }
            let room = self.capacity - inner.buf.len();
            if room == 0 {
                // Short timeout so cancellation is noticed even if
                // the consumer never pops again.
                let (guard, _) = self
                    .not_full
                    .wait_timeout(inner, Duration::from_millis(10))
                    .unwrap();
                inner = guard;
                continue;
            }
            let n = room.min(remaining.len());
            inner.buf.extend(remaining[..n].iter().copied());
            remaining = &remaining[n..];
        }
        true
    }

    /// Pop one sample without blocking.
    pub fn try_pop(&self) -> Pop {
        let mut inner = self.inner.lock().unwrap();
        match inner.buf.pop_front() {
            Some(s) => {
                self.not_full.notify_one();
                Pop::Sample(s)
            }
            None if inner.closed => Pop::Closed,
            None => Pop::Empty,
        }
    }

    /// Close the queue. Queued samples remain poppable; further
    /// pushes fail.
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
        self.not_full.notify_one();
    }

    /// Record that a consumer found the queue empty mid-stream.
    pub fn note_underflow(&self) {
        self.underflows.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of underflow events recorded so far.
    #[must_use]
    pub fn underflows(&self) -> u64 {
        self.underflows.load(Ordering::Relaxed)
    }

    /// Block until the queue holds at least `level` samples, the
    /// queue closes, or the token is cancelled. Used to pre-fill
    /// before starting the radio transfer.
    pub fn wait_level(&self, level: usize, cancel: &CancellationToken) {
        let level = level.min(self.capacity);
        loop {
            {
                let inner = self.inner.lock().unwrap();
                if inner.buf.len() >= level || inner.closed {
                    return;
                }
            }
            if cancel.is_canceled() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample(x: f32) -> Complex {
        Complex::new(x, -x)
    }

    #[test]
    fn fifo_order() {
        let q = SampleQueue::new(8);
        let cancel = CancellationToken::new();
        assert!(q.push_slice(&[sample(1.0), sample(2.0)], &cancel));
        assert_eq!(q.try_pop(), Pop::Sample(sample(1.0)));
        assert_eq!(q.try_pop(), Pop::Sample(sample(2.0)));
        assert_eq!(q.try_pop(), Pop::Empty);
    }

    #[test]
    fn close_drains_then_reports_closed() {
        let q = SampleQueue::new(8);
        let cancel = CancellationToken::new();
        assert!(q.push_slice(&[sample(1.0)], &cancel));
        q.close();
        assert!(!q.push_slice(&[sample(2.0)], &cancel));
        assert_eq!(q.try_pop(), Pop::Sample(sample(1.0)));
        assert_eq!(q.try_pop(), Pop::Closed);
    }

    #[test]
    fn full_queue_blocks_until_popped() {
        let q = Arc::new(SampleQueue::new(4));
        let cancel = CancellationToken::new();
        let samples: Vec<Complex> = (0..8).map(|i| sample(i as f32)).collect();

        let q2 = q.clone();
        let c2 = cancel.clone();
        let producer = std::thread::spawn(move || q2.push_slice(&samples, &c2));

        // Drain until the producer finishes all 8.
        let mut got = Vec::new();
        while got.len() < 8 {
            if let Pop::Sample(s) = q.try_pop() {
                got.push(s);
            } else {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        assert!(producer.join().unwrap());
        assert_eq!(got, (0..8).map(|i| sample(i as f32)).collect::<Vec<_>>());
    }

    #[test]
    fn cancellation_unblocks_producer() {
        let q = Arc::new(SampleQueue::new(2));
        let cancel = CancellationToken::new();
        let samples: Vec<Complex> = (0..8).map(|i| sample(i as f32)).collect();

        let q2 = q.clone();
        let c2 = cancel.clone();
        let producer = std::thread::spawn(move || q2.push_slice(&samples, &c2));
        std::thread::sleep(Duration::from_millis(20));
        cancel.cancel();
        assert!(!producer.join().unwrap());
    }

    #[test]
    fn underflow_counter_accumulates() {
        let q = SampleQueue::new(2);
        assert_eq!(q.underflows(), 0);
        q.note_underflow();
        q.note_underflow();
        assert_eq!(q.underflows(), 2);
    }
}
