/*!
 * Blocking FIFO Queue
 *
 * Unbounded FIFO guarded by one mutex and one condition variable.
 *
 * # Consumption modes
 *
 * - `try_dequeue` / `try_peek`: never block
 * - `wait_and_dequeue(Timeout::Infinite)`: block until an element arrives
 * - `wait_and_dequeue(timeout)`: block until an element arrives or the
 *   deadline passes
 *
 * # Wake-up semantics
 *
 * Every enqueue broadcasts to all parked consumers. A woken consumer is not
 * guaranteed to get the new element (another consumer, or the producer's next
 * call, may take it first under the same lock), so waiters loop: re-check the
 * queue, then re-park until the deadline fixed at call entry.
 *
 * # Fairness
 *
 * Elements leave in insertion order, but parked consumers are NOT serviced in
 * arrival order. Which waiter wins after a broadcast depends on lock
 * reacquisition order and is scheduler-defined.
 */

use super::stats::QueueStats;
use super::timeout::Timeout;
use crate::core::errors::{QueueError, QueueResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// Lock-protected state: the elements plus counters that must agree with them
struct State<T> {
    items: VecDeque<T>,
    waiters: usize,
    enqueued: u64,
    dequeued: u64,
    cleared: u64,
    timeouts: u64,
}

impl<T> State<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            waiters: 0,
            enqueued: 0,
            dequeued: 0,
            cleared: 0,
            timeouts: 0,
        }
    }

    #[inline]
    fn pop(&mut self) -> Option<T> {
        let item = self.items.pop_front();
        if item.is_some() {
            self.dequeued += 1;
        }
        item
    }
}

/// Thread-safe blocking FIFO queue
///
/// Share it between threads with `Arc`; the queue is intentionally not
/// `Clone`, each instance owns its own lock and condition variable.
///
/// # Examples
///
/// ```
/// use sync_queue::core::sync::{BlockingQueue, Timeout};
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(BlockingQueue::new());
/// let producer = Arc::clone(&queue);
///
/// thread::spawn(move || producer.enqueue(42));
///
/// assert_eq!(queue.wait_and_dequeue(Timeout::millis(1000)), Some(42));
/// assert_eq!(queue.try_dequeue(), None);
/// ```
pub struct BlockingQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
}

impl<T> BlockingQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty queue with room for `capacity` elements
    ///
    /// Capacity only pre-allocates; the queue grows without bound.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State::with_capacity(capacity)),
            not_empty: Condvar::new(),
        }
    }

    /// Number of queued elements (point-in-time)
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Append an element and wake every parked consumer
    ///
    /// Never blocks beyond the critical section and never fails.
    pub fn enqueue(&self, item: T) {
        let mut state = self.state.lock();
        state.items.push_back(item);
        state.enqueued += 1;

        if state.waiters > 0 {
            let woken = self.not_empty.notify_all();
            trace!(woken, waiters = state.waiters, "enqueue broadcast");
        }
    }

    /// Remove and return the head element without blocking
    pub fn try_dequeue(&self) -> Option<T> {
        self.state.lock().pop()
    }

    /// Block until the head element can be removed or `timeout` expires
    ///
    /// Returns `None` only when the deadline passed with the queue still
    /// empty. `Timeout::Infinite` never returns `None`; `Timeout::ZERO`
    /// behaves exactly like [`try_dequeue`](Self::try_dequeue).
    pub fn wait_and_dequeue(&self, timeout: impl Into<Timeout>) -> Option<T> {
        let timeout = timeout.into();
        if timeout == Timeout::ZERO {
            return self.try_dequeue();
        }

        let deadline = timeout.deadline_from(Instant::now());
        let mut state = self.state.lock();

        loop {
            if let Some(item) = state.pop() {
                return Some(item);
            }

            state.waiters += 1;
            match deadline {
                None => self.not_empty.wait(&mut state),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        state.waiters -= 1;
                        state.timeouts += 1;
                        trace!(?timeout, "dequeue wait timed out");
                        return None;
                    }
                    // Timed-out waits still loop once more: an element may
                    // have landed between the wake and the reacquire
                    let _ = self.not_empty.wait_until(&mut state, deadline);
                }
            }
            state.waiters -= 1;
        }
    }

    /// Like [`wait_and_dequeue`](Self::wait_and_dequeue), reporting an
    /// expired wait as [`QueueError::Timeout`]
    pub fn dequeue_timeout(&self, timeout: impl Into<Timeout>) -> QueueResult<T> {
        self.wait_and_dequeue(timeout).ok_or(QueueError::Timeout)
    }

    /// Remove every element
    ///
    /// Waiters are not notified; clearing never makes a dequeue succeed.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let discarded = state.items.len();
        state.items.clear();
        state.cleared += discarded as u64;
        debug!(discarded, waiters = state.waiters, "queue cleared");
    }

    /// Counter snapshot for monitoring
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            length: state.items.len(),
            waiters: state.waiters,
            enqueued: state.enqueued,
            dequeued: state.dequeued,
            cleared: state.cleared,
            timeouts: state.timeouts,
        }
    }

    /// Threads currently parked in a blocking dequeue (for diagnostics)
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters
    }
}

impl<T: Clone> BlockingQueue<T> {
    /// Return a copy of the head element without removing it
    pub fn try_peek(&self) -> Option<T> {
        self.state.lock().items.front().cloned()
    }

    /// Head-to-tail copy of the queue contents
    pub fn snapshot(&self) -> Vec<T> {
        self.state.lock().items.iter().cloned().collect()
    }
}

impl<T: Send + 'static> BlockingQueue<T> {
    /// Async-compatible wait using tokio::spawn_blocking
    ///
    /// The blocking wait runs on tokio's blocking pool, so runtime workers
    /// are never parked on the condition variable.
    pub async fn wait_and_dequeue_async(
        self: Arc<Self>,
        timeout: impl Into<Timeout>,
    ) -> QueueResult<Option<T>> {
        let timeout = timeout.into();
        tokio::task::spawn_blocking(move || self.wait_and_dequeue(timeout))
            .await
            .map_err(|_| QueueError::Cancelled)
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BlockingQueue")
            .field("len", &state.items.len())
            .field("waiters", &state.waiters)
            .finish()
    }
}
