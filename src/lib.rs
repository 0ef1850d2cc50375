/*!
 * Sync Queue Library
 * Thread-safe blocking FIFO queue and a producer/consumer pipeline built on it
 */

pub mod core;
pub mod monitoring;
pub mod pipeline;

// Re-exports
pub use crate::core::errors::{QueueError, QueueResult};
pub use crate::core::sync::{BlockingQueue, QueueStats, Timeout};
pub use monitoring::{init_tracing, try_init_tracing};
pub use pipeline::{CancelToken, Pipeline, PipelineConfig, PipelineReport, WorkItem};
