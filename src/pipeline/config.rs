/*!
 * Pipeline Configuration
 *
 * Worker counts and pacing for producer/consumer runs
 */

use crate::core::errors::{QueueError, QueueResult};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_PRODUCERS: &str = "PRODCONS_PRODUCERS";
pub const ENV_CONSUMERS: &str = "PRODCONS_CONSUMERS";
pub const ENV_ITEMS: &str = "PRODCONS_ITEMS";
pub const ENV_POLL_MS: &str = "PRODCONS_POLL_MS";
pub const ENV_PRODUCE_DELAY_MS: &str = "PRODCONS_PRODUCE_DELAY_MS";
pub const ENV_CONSUME_DELAY_MS: &str = "PRODCONS_CONSUME_DELAY_MS";
pub const ENV_DRAIN_GRACE_MS: &str = "PRODCONS_DRAIN_GRACE_MS";

/// Upper bound on up-front buffer allocation; larger runs grow on demand
pub const MAX_PREALLOCATED_ITEMS: usize = 4096;

/// Producer/consumer run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of producer threads
    pub producers: usize,
    /// Number of consumer threads
    pub consumers: usize,
    /// Items each producer enqueues
    pub items_per_producer: usize,
    /// Consumer wait per `wait_and_dequeue` call
    pub poll_timeout: Duration,
    /// Simulated work between enqueues
    pub produce_delay: Duration,
    /// Simulated work after each dequeue
    pub consume_delay: Duration,
    /// Time consumers keep polling after the last producer finishes
    pub drain_grace: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            producers: 2,
            consumers: 2,
            items_per_producer: 10,
            poll_timeout: Duration::from_millis(500),
            produce_delay: Duration::from_millis(100),
            consume_delay: Duration::from_millis(150),
            drain_grace: Duration::from_millis(1000),
        }
    }
}

impl PipelineConfig {
    /// Configuration without artificial delays (tests, benchmarks)
    pub const fn quick() -> Self {
        Self {
            producers: 2,
            consumers: 2,
            items_per_producer: 10,
            poll_timeout: Duration::from_millis(20),
            produce_delay: Duration::ZERO,
            consume_delay: Duration::ZERO,
            drain_grace: Duration::from_millis(50),
        }
    }

    pub fn with_workers(mut self, producers: usize, consumers: usize) -> Self {
        self.producers = producers;
        self.consumers = consumers;
        self
    }

    pub fn with_items_per_producer(mut self, items: usize) -> Self {
        self.items_per_producer = items;
        self
    }

    /// Total items a complete run produces (`None` on overflow)
    pub fn total_items(&self) -> Option<usize> {
        self.producers.checked_mul(self.items_per_producer)
    }

    /// Buffer size to reserve up front for `items` elements
    pub fn preallocation(items: usize) -> usize {
        items.min(MAX_PREALLOCATED_ITEMS)
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.producers == 0 {
            return Err(QueueError::InvalidConfig("producers must be > 0".into()));
        }
        if self.consumers == 0 {
            return Err(QueueError::InvalidConfig("consumers must be > 0".into()));
        }
        if self.total_items().is_none() {
            return Err(QueueError::InvalidConfig(format!(
                "{} producers x {} items overflows the item count",
                self.producers, self.items_per_producer
            )));
        }
        if self.poll_timeout.is_zero() {
            return Err(QueueError::InvalidConfig(
                "poll timeout must be > 0ms".into(),
            ));
        }
        Ok(())
    }

    /// Defaults overridden by `PRODCONS_*` environment variables
    pub fn from_env() -> QueueResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> QueueResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, ENV_PRODUCERS)? {
            config.producers = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_CONSUMERS)? {
            config.consumers = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_ITEMS)? {
            config.items_per_producer = v;
        }
        if let Some(ms) = parse_var(&lookup, ENV_POLL_MS)? {
            config.poll_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, ENV_PRODUCE_DELAY_MS)? {
            config.produce_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, ENV_CONSUME_DELAY_MS)? {
            config.consume_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, ENV_DRAIN_GRACE_MS)? {
            config.drain_grace = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<F, V>(lookup: &F, key: &str) -> QueueResult<Option<V>>
where
    F: Fn(&str) -> Option<String>,
    V: FromStr,
    V::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| QueueError::InvalidConfig(format!("{key}={raw:?}: {e}"))),
    }
}
