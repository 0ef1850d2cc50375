/*!
 * Structured Tracing
 * Subscriber setup and run spans using the tracing crate
 *
 * Features:
 * - `RUST_LOG` filtering (default: info)
 * - JSON-formatted logs for structured parsing
 * - Run spans that record duration and item counts on close
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

static RUN_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Runs slower than this are reported at warn level
const SLOW_RUN_MS: u128 = 30_000;

fn json_requested() -> bool {
    std::env::var("PRODCONS_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
}

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - PRODCONS_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` if a global subscriber was already installed.
pub fn try_init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json_requested() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = json_requested(), "Structured tracing initialized");
    }
    installed
}

/// Initialize structured tracing, ignoring an already-installed subscriber
pub fn init_tracing() {
    if !try_init_tracing() {
        debug!("Tracing subscriber already installed");
    }
}

/// Span covering one pipeline run
pub struct RunSpan {
    span: tracing::Span,
    start: Instant,
    run_id: u64,
}

impl RunSpan {
    pub fn new(label: &str) -> Self {
        let run_id = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
        let span = span!(
            Level::INFO,
            "run",
            run_id = run_id,
            label = label,
            duration_ms = tracing::field::Empty,
            items = tracing::field::Empty,
        );
        debug!(parent: &span, run_id, label, "run started");

        Self {
            span,
            start: Instant::now(),
            run_id,
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Record the number of items that passed through the run
    pub fn record_items(&self, items: usize) {
        self.span.record("items", items);
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Handle for attaching worker threads to this run
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }
}

impl Drop for RunSpan {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_millis();
        self.span.record("duration_ms", duration_ms);

        if duration_ms > SLOW_RUN_MS {
            warn!(parent: &self.span, run_id = self.run_id, duration_ms, slow = true, "slow run detected");
        } else {
            debug!(parent: &self.span, run_id = self.run_id, duration_ms, "run completed");
        }
    }
}
