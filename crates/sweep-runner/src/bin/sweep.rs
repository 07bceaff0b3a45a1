use anyhow::Context;
use sweep_optimizer::CancellationFlag;
use sweep_runner::RunnerConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SWEEP_CONFIG").ok())
        .context("usage: sweep <run.json> (or set SWEEP_CONFIG)")?;
    let config = RunnerConfig::load(&path).with_context(|| format!("loading {path}"))?;

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with the best result so far");
            on_interrupt.cancel();
        }
    });

    let report = sweep_runner::run(config, cancel).await?;
    info!(
        "Best fitness {} at {:?} after {}s ({:?})",
        report.outcome.best.fitness,
        report.outcome.best.parameters,
        report.outcome.duration_seconds(),
        report.outcome.state
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
