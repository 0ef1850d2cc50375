/*!
 * Queue Statistics
 * Point-in-time counters for monitoring code
 */

use serde::{Deserialize, Serialize};

/// Queue statistics snapshot
///
/// All fields are read under the queue lock, so
/// `length == enqueued - dequeued - cleared` holds for every snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Elements currently queued
    pub length: usize,
    /// Threads currently parked in a blocking dequeue
    pub waiters: usize,
    /// Successful enqueues
    pub enqueued: u64,
    /// Successful dequeues (all consumption modes)
    pub dequeued: u64,
    /// Elements discarded by `clear`
    pub cleared: u64,
    /// Blocking dequeues that gave up at their deadline
    pub timeouts: u64,
}

impl QueueStats {
    /// Elements that entered the queue but were neither dequeued nor cleared
    pub fn in_flight(&self) -> u64 {
        self.enqueued
            .saturating_sub(self.dequeued)
            .saturating_sub(self.cleared)
    }
}
