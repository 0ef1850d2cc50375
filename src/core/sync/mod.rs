/*!
 * Synchronization Primitives
 *
 * Monitor-style blocking queue for producer/consumer coordination:
 * - One `parking_lot::Mutex` guards the element sequence
 * - One `parking_lot::Condvar` broadcasts on every enqueue
 * - Timed waits track an absolute deadline fixed at call entry
 *
 * # Use Cases
 *
 * - **Producers**: `enqueue` only
 * - **Consumers**: `try_dequeue`, `try_peek`, `wait_and_dequeue`
 * - **Monitoring/management**: `len`, `snapshot`, `stats`, `clear`
 */

mod queue;
mod stats;
mod timeout;

pub use queue::BlockingQueue;
pub use stats::QueueStats;
pub use timeout::Timeout;
