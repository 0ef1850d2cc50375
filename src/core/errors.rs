/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use miette::Diagnostic;
use thiserror::Error;

/// Result type for fallible queue and pipeline operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Queue and pipeline errors
///
/// Empty queues and expired waits are ordinary outcomes and are reported as
/// `None` by the queue operations. These variants only surface through the
/// result-returning APIs and at configuration boundaries.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum QueueError {
    #[error("Wait operation timed out")]
    #[diagnostic(
        code(queue::timeout),
        help("No element arrived before the deadline. Retry or use a longer timeout.")
    )]
    Timeout,

    #[error("Invalid timeout: {0}ms")]
    #[diagnostic(
        code(queue::invalid_timeout),
        help("Use a non-negative number of milliseconds, or -1 to wait indefinitely.")
    )]
    InvalidTimeout(i64),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(pipeline::invalid_config),
        help("Check the PRODCONS_* environment variables.")
    )]
    InvalidConfig(String),

    #[error("Failed to spawn worker thread: {0}")]
    #[diagnostic(
        code(pipeline::spawn_failed),
        help("The system may be out of threads or memory. Reduce worker counts.")
    )]
    SpawnFailed(String),

    #[error("Worker thread panicked: {0}")]
    #[diagnostic(code(pipeline::worker_panicked))]
    WorkerPanicked(String),

    #[error("Wait was cancelled")]
    #[diagnostic(code(queue::cancelled))]
    Cancelled,
}

impl QueueError {
    /// Whether the error is a plain expired wait
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueueError::Timeout)
    }
}
