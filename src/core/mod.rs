/*!
 * Core Module
 * Queue primitive and error handling
 */

pub mod errors;
pub mod sync;

// Re-export for convenience
pub use errors::*;
pub use sync::{BlockingQueue, QueueStats, Timeout};
