/*!
 * Pipeline Types
 * Work items, cancellation, and run reports
 */

use crate::core::sync::QueueStats;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Item tagged with its producer, so runs can be checked for loss and duplication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkItem {
    pub producer: usize,
    pub sequence: usize,
}

impl WorkItem {
    pub const fn new(producer: usize, sequence: usize) -> Self {
        Self { producer, sequence }
    }

    /// Flat numeric value: `producer * 1000 + sequence`
    pub const fn value(&self) -> usize {
        self.producer * 1000 + self.sequence
    }
}

/// Cooperative cancellation flag shared by all workers of a run
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// What a single consumer took off the queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerReport {
    pub id: usize,
    /// Items received through timed waits while the run was active
    pub items: Vec<WorkItem>,
    /// Items picked up by the final non-blocking drain
    pub drained: Vec<WorkItem>,
}

impl ConsumerReport {
    pub fn total(&self) -> usize {
        self.items.len() + self.drained.len()
    }
}

/// Outcome of a producer/consumer run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Every item enqueued, grouped by producer in enqueue order
    pub produced: Vec<WorkItem>,
    pub consumers: Vec<ConsumerReport>,
    /// Items still queued after all consumers exited
    pub remaining: usize,
    pub cancelled: bool,
    pub stats: QueueStats,
    pub elapsed_ms: u64,
}

impl PipelineReport {
    pub fn consumed_count(&self) -> usize {
        self.consumers.iter().map(ConsumerReport::total).sum()
    }

    /// All consumed items, regardless of consumer or mode
    pub fn consumed(&self) -> impl Iterator<Item = &WorkItem> {
        self.consumers
            .iter()
            .flat_map(|c| c.items.iter().chain(c.drained.iter()))
    }

    /// Consumed multiset equals produced multiset, each item exactly once
    pub fn is_lossless(&self) -> bool {
        let mut counts: HashMap<WorkItem, i64> = HashMap::with_capacity(self.produced.len());
        for item in &self.produced {
            *counts.entry(*item).or_default() += 1;
        }
        for item in self.consumed() {
            *counts.entry(*item).or_default() -= 1;
        }
        counts.values().all(|&n| n == 0)
    }
}
