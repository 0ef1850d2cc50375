/*!
 * Pipeline Runner
 *
 * Drives producers and consumers over one shared `BlockingQueue`:
 * 1. producers enqueue their items, pacing with `produce_delay`
 * 2. consumers poll with timed waits while the run is active
 * 3. after producers finish and the grace period ends, consumers drain
 *    leftovers with non-blocking dequeues and exit
 */

use super::config::PipelineConfig;
use super::types::{CancelToken, ConsumerReport, PipelineReport, WorkItem};
use crate::core::errors::{QueueError, QueueResult};
use crate::core::sync::BlockingQueue;
use crate::monitoring::RunSpan;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest single sleep while waiting out the grace period
const GRACE_SLICE: Duration = Duration::from_millis(10);

/// Producer/consumer pipeline
///
/// Every run gets a fresh queue, so reports never include items or counters
/// from an earlier run.
pub struct Pipeline {
    config: PipelineConfig,
    queue: Mutex<Arc<BlockingQueue<WorkItem>>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> QueueResult<Self> {
        config.validate()?;
        let queue = Mutex::new(Arc::new(Self::fresh_queue(&config)));
        Ok(Self { config, queue })
    }

    fn fresh_queue(config: &PipelineConfig) -> BlockingQueue<WorkItem> {
        let total = config.total_items().unwrap_or(usize::MAX);
        BlockingQueue::with_capacity(PipelineConfig::preallocation(total))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Queue of the current (or most recent) run, for monitoring
    pub fn queue(&self) -> Arc<BlockingQueue<WorkItem>> {
        Arc::clone(&self.queue.lock())
    }

    /// Execute one run and block until every worker has exited
    pub fn run(&self, cancel: &CancelToken) -> QueueResult<PipelineReport> {
        let run_span = RunSpan::new("producer-consumer");
        let _entered = run_span.enter();
        let start = Instant::now();

        let queue = Arc::new(Self::fresh_queue(&self.config));
        *self.queue.lock() = Arc::clone(&queue);

        let workers = Workers {
            running: Arc::new(AtomicBool::new(true)),
            abort: CancelToken::new(),
        };

        info!(
            producers = self.config.producers,
            consumers = self.config.consumers,
            items_per_producer = self.config.items_per_producer,
            "Starting pipeline run"
        );

        let (producers, spawned) = self.spawn_producers(&queue, &run_span, cancel, &workers);
        let (consumers, spawned) = match spawned {
            Ok(()) => self.spawn_consumers(&queue, &run_span, cancel, &workers),
            Err(e) => (Vec::new(), Err(e)),
        };
        if let Err(e) = spawned {
            warn!(error = %e, "Worker spawn failed, stopping run");
            workers.shutdown(producers, consumers);
            return Err(e);
        }

        let produced: Vec<QueueResult<Vec<WorkItem>>> =
            producers.into_iter().map(join_worker).collect();

        if produced.iter().all(Result::is_ok) {
            grace_period(self.config.drain_grace, cancel);
        }
        workers.running.store(false, Ordering::Release);

        let consumed: Vec<QueueResult<ConsumerReport>> =
            consumers.into_iter().map(join_worker).collect();

        let produced: Vec<WorkItem> = produced
            .into_iter()
            .collect::<QueueResult<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();
        let consumers = consumed.into_iter().collect::<QueueResult<Vec<_>>>()?;

        let report = PipelineReport {
            produced,
            consumers,
            remaining: queue.len(),
            cancelled: cancel.is_cancelled(),
            stats: queue.stats(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        run_span.record_items(report.consumed_count());

        if report.remaining > 0 {
            warn!(remaining = report.remaining, "Run ended with items still queued");
        }
        info!(
            produced = report.produced.len(),
            consumed = report.consumed_count(),
            cancelled = report.cancelled,
            elapsed_ms = report.elapsed_ms,
            "Pipeline run finished"
        );

        Ok(report)
    }

    fn spawn_producers(
        &self,
        queue: &Arc<BlockingQueue<WorkItem>>,
        run_span: &RunSpan,
        cancel: &CancelToken,
        workers: &Workers,
    ) -> (Vec<JoinHandle<Vec<WorkItem>>>, QueueResult<()>) {
        spawn_all(self.config.producers, "producer", |id| {
            let queue = Arc::clone(queue);
            let config = self.config.clone();
            let cancel = cancel.clone();
            let abort = workers.abort.clone();
            let span = run_span.span().clone();
            move || {
                let _entered = span.enter();
                produce(id, &queue, &config, &cancel, &abort)
            }
        })
    }

    fn spawn_consumers(
        &self,
        queue: &Arc<BlockingQueue<WorkItem>>,
        run_span: &RunSpan,
        cancel: &CancelToken,
        workers: &Workers,
    ) -> (Vec<JoinHandle<ConsumerReport>>, QueueResult<()>) {
        spawn_all(self.config.consumers, "consumer", |id| {
            let queue = Arc::clone(queue);
            let config = self.config.clone();
            let running = Arc::clone(&workers.running);
            let cancel = cancel.clone();
            let span = run_span.span().clone();
            move || {
                let _entered = span.enter();
                consume(id, &queue, &config, &running, &cancel)
            }
        })
    }
}

/// Run-local stop signals, independent of the caller's token
struct Workers {
    /// Consumers keep polling while set
    running: Arc<AtomicBool>,
    /// Stops producers when the run is abandoned
    abort: CancelToken,
}

impl Workers {
    /// Stop and join everything spawned so far
    fn shutdown(
        &self,
        producers: Vec<JoinHandle<Vec<WorkItem>>>,
        consumers: Vec<JoinHandle<ConsumerReport>>,
    ) {
        self.abort.cancel();
        self.running.store(false, Ordering::Release);

        for handle in producers {
            if let Err(e) = join_worker(handle) {
                warn!(error = %e, "Producer failed during shutdown");
            }
        }
        for handle in consumers {
            if let Err(e) = join_worker(handle) {
                warn!(error = %e, "Consumer failed during shutdown");
            }
        }
    }
}

fn produce(
    id: usize,
    queue: &BlockingQueue<WorkItem>,
    config: &PipelineConfig,
    cancel: &CancelToken,
    abort: &CancelToken,
) -> Vec<WorkItem> {
    let mut produced =
        Vec::with_capacity(PipelineConfig::preallocation(config.items_per_producer));

    for sequence in 0..config.items_per_producer {
        if cancel.is_cancelled() || abort.is_cancelled() {
            break;
        }

        let item = WorkItem::new(id, sequence);
        queue.enqueue(item);
        produced.push(item);
        debug!(producer = id, item = item.value(), "produced");

        if !config.produce_delay.is_zero() {
            thread::sleep(config.produce_delay);
        }
    }

    info!(producer = id, count = produced.len(), "Producer finished");
    produced
}

fn consume(
    id: usize,
    queue: &BlockingQueue<WorkItem>,
    config: &PipelineConfig,
    running: &AtomicBool,
    cancel: &CancelToken,
) -> ConsumerReport {
    let mut report = ConsumerReport {
        id,
        ..Default::default()
    };

    while running.load(Ordering::Acquire) && !cancel.is_cancelled() {
        if let Some(item) = queue.wait_and_dequeue(config.poll_timeout) {
            debug!(consumer = id, item = item.value(), "consumed");
            report.items.push(item);

            if !config.consume_delay.is_zero() {
                thread::sleep(config.consume_delay);
            }
        }
    }

    // Process any remaining items
    while let Some(item) = queue.try_dequeue() {
        debug!(consumer = id, item = item.value(), "consumed final");
        report.drained.push(item);
    }

    info!(
        consumer = id,
        consumed = report.items.len(),
        drained = report.drained.len(),
        "Consumer finished"
    );
    report
}

/// Sleep for `duration`, returning early on cancellation
fn grace_period(duration: Duration, cancel: &CancelToken) {
    let deadline = Instant::now() + duration;
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(GRACE_SLICE));
    }
}

fn spawn_worker<F, R>(name: String, f: F) -> QueueResult<JoinHandle<R>>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|e| QueueError::SpawnFailed(format!("{name}: {e}")))
}

/// Spawn `count` named workers, stopping at the first failure
///
/// Handles spawned before a failure are returned alongside the error so the
/// caller can stop and join them.
fn spawn_all<R, F, W>(
    count: usize,
    role: &str,
    mut make: W,
) -> (Vec<JoinHandle<R>>, QueueResult<()>)
where
    W: FnMut(usize) -> F,
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let mut handles = Vec::with_capacity(count);
    for id in 0..count {
        match spawn_worker(format!("{role}-{id}"), make(id)) {
            Ok(handle) => handles.push(handle),
            Err(e) => return (handles, Err(e)),
        }
    }
    (handles, Ok(()))
}

fn join_worker<R>(handle: JoinHandle<R>) -> QueueResult<R> {
    let name = handle.thread().name().unwrap_or("worker").to_string();
    handle
        .join()
        .map_err(|payload| QueueError::WorkerPanicked(format!("{name}: {}", panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
