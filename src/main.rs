/*!
 * prodcons - Producer/Consumer Demo
 *
 * Runs producers and consumers over one blocking queue and reports what
 * every consumer received.
 *
 * Environment variables:
 * - PRODCONS_* : pipeline configuration (see `PipelineConfig::from_env`)
 * - PRODCONS_REPORT_JSON : print the full run report as JSON
 */

use miette::{miette, IntoDiagnostic};
use sync_queue::{init_tracing, CancelToken, Pipeline, PipelineConfig};
use tracing::{info, warn};

fn report_json_requested() -> bool {
    std::env::var("PRODCONS_REPORT_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize structured tracing
    init_tracing();

    let config = PipelineConfig::from_env()?;
    info!(?config, "prodcons starting");

    let pipeline = Pipeline::new(config)?;
    let cancel = CancelToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            ctrl_c.cancel();
        }
    });

    let run_cancel = cancel.clone();
    let report = tokio::task::spawn_blocking(move || pipeline.run(&run_cancel))
        .await
        .into_diagnostic()??;

    for consumer in &report.consumers {
        info!(
            consumer = consumer.id,
            consumed = consumer.items.len(),
            drained = consumer.drained.len(),
            "Consumer summary"
        );
    }
    info!(stats = ?report.stats, "Queue summary");

    if report_json_requested() {
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
    }

    if !report.cancelled && !report.is_lossless() {
        return Err(miette!(
            "run lost or duplicated items: produced {}, consumed {}",
            report.produced.len(),
            report.consumed_count()
        ));
    }

    Ok(())
}
