/*!
 * Monitoring
 * Tracing setup for the queue and the producer/consumer pipeline
 */

mod tracer;

pub use tracer::{init_tracing, try_init_tracing, RunSpan};
