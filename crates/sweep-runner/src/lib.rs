// Sweep runner
// Drives one optimization against an external evaluator program

pub mod command;
pub mod config;

use serde::{Deserialize, Serialize};
use sweep_optimizer::{
    CancellationFlag, GuardedEvaluator, OptimizationOutcome, Optimizer, ResultCache,
};
use sweep_types::{Report, SweepResult};
use tracing::info;

pub use command::{parse_report, CommandEvaluator};
pub use config::{CommandSpec, RunnerConfig};

/// One evaluated candidate, keyed by its canonical text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedCandidate {
    pub key: String,
    pub report: Report,
}

/// Printed by the `sweep` binary when a run ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub outcome: OptimizationOutcome,
    pub results: Vec<EvaluatedCandidate>,
}

/// Run the configured optimization until it completes or `cancel` is set.
pub async fn run(config: RunnerConfig, cancel: CancellationFlag) -> SweepResult<RunReport> {
    let optimizer = Optimizer::new(config.optimization.clone());
    let plan = optimizer.plan()?;
    info!(
        "Evaluating with '{}' (settle {:?}, timeout {:?})",
        config.command.program,
        config.settle(),
        config.timeout()
    );

    let command = CommandEvaluator::new(config.command.clone());
    let evaluator = GuardedEvaluator::new(command, plan.space.dimensions)
        .with_settle(config.settle())
        .with_timeout(config.timeout());
    let cache = ResultCache::new();

    let outcome = optimizer.run(&evaluator, &cache, cancel).await?;
    let stats = cache.stats();
    info!(
        "Cache: {} stored, {} hits, {} misses",
        stats.stores, stats.hits, stats.misses
    );

    let results = cache
        .entries()
        .into_iter()
        .map(|(key, report)| EvaluatedCandidate { key, report })
        .collect();

    Ok(RunReport { outcome, results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_optimizer::{Algorithm, OptimizationConfig, OptimizationState};
    use sweep_types::{RangeSpec, SweepError};

    fn echo_config(dimensions: Vec<RangeSpec>) -> RunnerConfig {
        RunnerConfig {
            optimization: OptimizationConfig::new("echo", Algorithm::Traversal, dimensions),
            command: CommandSpec {
                program: "echo".into(),
                args: vec![],
                probe_args: None,
            },
            settle_ms: 0,
            timeout_ms: 5_000,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn traversal_through_echo_picks_the_largest_value() {
        let report = run(echo_config(vec![RangeSpec::new(1, 4, 1)]), CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(report.outcome.state, OptimizationState::Completed);
        assert_eq!(report.outcome.best.parameters, vec![4.0]);
        assert_eq!(report.outcome.best.fitness, 4.0);
        assert!(report.outcome.duration_seconds() >= 0);
        let keys: Vec<&str> = report.results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn invalid_dimensions_fail_before_any_command_runs() {
        let err = run(echo_config(vec![RangeSpec::new(5, 1, 1)]), CancellationFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SweepError::Dimension(_)));
    }

    #[tokio::test]
    async fn cancelled_run_reports_no_results() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let report = run(echo_config(vec![RangeSpec::new(1, 4, 1)]), cancel)
            .await
            .unwrap();

        assert_eq!(report.outcome.state, OptimizationState::Cancelled);
        assert!(report.results.is_empty());
        assert!(!report.outcome.best.is_found());
    }
}
