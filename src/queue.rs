use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;

/// An unbounded multi-producer/multi-consumer FIFO that knows when its
/// stream of values has ended.
///
/// Producers push through [`Writer`] handles; the queue counts them and
/// closes irreversibly when the last one drops. A freshly created queue
/// holds one placeholder reference so that readers block (rather than
/// observe a spurious end-of-stream) until a producer has had the chance
/// to attach. The first [`make_writer`](StreamQueue::make_writer) call
/// redeems the placeholder: the handle it returns takes over that unit of
/// the count.
///
/// The queue value itself is a cheap handle; cloning it shares the same
/// underlying buffer.
pub struct StreamQueue<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
}

struct State<T> {
    items: VecDeque<T>,
    /// Live writer handles, plus the placeholder until it is redeemed.
    writers: usize,
    first_writer: bool,
}

impl<T> StreamQueue<T> {
    /// Create an empty, open queue with the placeholder reference intact.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    items: VecDeque::new(),
                    writers: 1,
                    first_writer: false,
                }),
                cond: Condvar::new(),
            }),
        }
    }

    /// Attach a new producer.
    ///
    /// The first call does not increment the writer count: the returned
    /// handle takes over the placeholder reference, so the queue closes
    /// exactly when the last real writer drops.
    pub fn make_writer(&self) -> Writer<T> {
        let mut state = self.shared.state.lock();
        if state.first_writer {
            state.writers += 1;
        } else {
            state.first_writer = true;
        }
        Writer {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Wait for and remove the next value.
    ///
    /// Blocks until a value is available or the queue closes. Returns
    /// `None` only once the queue is closed *and* drained; end-of-stream
    /// is terminal, so every subsequent call also returns `None`.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.shared.state.lock();
        loop {
            if let Some(value) = state.items.pop_front() {
                return Some(value);
            }
            if state.writers == 0 {
                return None;
            }
            self.shared.cond.wait(&mut state);
        }
    }

    /// Number of values currently buffered (a snapshot).
    pub fn len(&self) -> usize {
        self.shared.state.lock().items.len()
    }

    /// Whether the buffer is currently empty (a snapshot).
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().items.is_empty()
    }

    /// A lazy consuming iterator over this queue.
    ///
    /// Multiple iterators may consume the same queue concurrently; each
    /// value goes to exactly one of them.
    pub fn iter(&self) -> StreamIter<T> {
        StreamIter {
            queue: self.clone(),
            buffered: None,
            finished: false,
        }
    }
}

impl<T> Clone for StreamQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for StreamQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A producer handle for a [`StreamQueue`].
///
/// Each live handle contributes one unit to the queue's writer count.
/// Cloning adds a unit, moving transfers it, and dropping removes it;
/// the queue closes when the count reaches zero.
pub struct Writer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Writer<T> {
    /// Enqueue a value and wake one waiting consumer.
    pub fn push(&self, value: T) {
        let mut state = self.shared.state.lock();
        debug_assert!(state.writers > 0);
        state.items.push_back(value);
        self.shared.cond.notify_one();
    }
}

impl<T> Clone for Writer<T> {
    fn clone(&self) -> Self {
        self.shared.state.lock().writers += 1;
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Writer<T> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        debug_assert!(state.writers > 0);
        state.writers -= 1;
        if state.writers == 0 {
            // Wake every blocked consumer so they can observe the close.
            self.shared.cond.notify_all();
        }
    }
}

/// A lazy, single-pass consuming iterator over a [`StreamQueue`].
///
/// Values are fetched on demand: [`peek`](StreamIter::peek) blocks until
/// a value arrives or the stream closes, and buffers what it read so that
/// repeated peeks see the same value. `next` consumes the buffered value,
/// fetching one first if nothing was peeked.
pub struct StreamIter<T> {
    queue: StreamQueue<T>,
    buffered: Option<T>,
    finished: bool,
}

impl<T> StreamIter<T> {
    fn fill(&mut self) {
        if self.buffered.is_none() && !self.finished {
            match self.queue.pop() {
                Some(value) => self.buffered = Some(value),
                None => self.finished = true,
            }
        }
    }

    /// Look at the next value without consuming it.
    ///
    /// Blocks like [`StreamQueue::pop`]. Returns `None` once the stream
    /// has ended. Note that asking "is there a next value?" necessarily
    /// performs a read on a blocking stream; there is no pure emptiness
    /// test.
    pub fn peek(&mut self) -> Option<&T> {
        self.fill();
        self.buffered.as_ref()
    }
}

impl<T> Iterator for StreamIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.fill();
        self.buffered.take()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // Best effort: what is buffered now is certainly coming, more may
        // follow until the queue closes.
        let lower = self.queue.len() + usize::from(self.buffered.is_some());
        (lower, None)
    }
}
