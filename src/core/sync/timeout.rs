/*!
 * Wait Timeouts
 *
 * Timeout policy for blocking dequeues.
 *
 * ## Semantics
 *
 * - `Infinite` blocks until an element arrives
 * - `After(d)` blocks for at most `d`, measured from call entry
 * - `After(Duration::ZERO)` never blocks
 *
 * The deadline is fixed once per call, so repeated wake-ups never extend the
 * total wait.
 */

use crate::core::errors::{QueueError, QueueResult};
use std::time::{Duration, Instant};

/// Timeout for a blocking dequeue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Wait until an element is available
    Infinite,
    /// Wait at most this long
    After(Duration),
}

impl Timeout {
    /// Millisecond sentinel meaning "wait indefinitely"
    pub const INFINITE_MILLIS: i64 = -1;

    /// Immediate check, identical to a non-blocking dequeue
    pub const ZERO: Self = Self::After(Duration::ZERO);

    /// Timeout of `ms` milliseconds
    pub const fn millis(ms: u64) -> Self {
        Self::After(Duration::from_millis(ms))
    }

    /// Convert a signed millisecond count
    ///
    /// `-1` maps to [`Timeout::Infinite`]; any other negative value is rejected.
    pub fn from_millis(ms: i64) -> QueueResult<Self> {
        match ms {
            Self::INFINITE_MILLIS => Ok(Self::Infinite),
            ms if ms < 0 => Err(QueueError::InvalidTimeout(ms)),
            ms => Ok(Self::After(Duration::from_millis(ms as u64))),
        }
    }

    /// Get the duration for this timeout (`None` when infinite)
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Infinite => None,
            Self::After(d) => Some(*d),
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }

    /// Absolute deadline for a wait starting at `start`
    ///
    /// A finite timeout too large to represent as an `Instant` has no deadline.
    pub fn deadline_from(&self, start: Instant) -> Option<Instant> {
        self.duration().and_then(|d| start.checked_add(d))
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::Infinite
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::After(d)
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(d: Option<Duration>) -> Self {
        d.map_or(Self::Infinite, Self::After)
    }
}
