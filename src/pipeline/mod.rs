/*!
 * Pipeline Module
 * Producer/consumer runs over a shared blocking queue
 */

pub mod config;
mod runner;
pub mod types;

// Re-export public API
pub use config::PipelineConfig;
pub use runner::Pipeline;
pub use types::{CancelToken, ConsumerReport, PipelineReport, WorkItem};
