//! Per-run search state shared by every strategy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use sweep_types::{canonical_key, Dimension, EvaluationError};
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::evaluator::Evaluator;

/// Cooperative stop signal. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Real evaluator invocations.
    pub evaluations: u64,
    pub cache_hits: u64,
    pub probes: u64,
    /// Evaluations that produced no observation, any cause.
    pub failures: u64,
    pub timeouts: u64,
    pub out_of_range: u64,
}

/// Explicit run state: evaluator, cache, cancellation and counters.
pub struct SearchContext<'a> {
    evaluator: &'a dyn Evaluator,
    cache: &'a ResultCache,
    cancel: CancellationFlag,
    dimensions: &'a [Dimension],
    probed: BTreeSet<usize>,
    stats: RunStats,
    stopped: bool,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        evaluator: &'a dyn Evaluator,
        cache: &'a ResultCache,
        cancel: CancellationFlag,
        dimensions: &'a [Dimension],
    ) -> Self {
        Self {
            evaluator,
            cache,
            cancel,
            dimensions,
            probed: BTreeSet::new(),
            stats: RunStats::default(),
            stopped: false,
        }
    }

    pub fn dimensions(&self) -> &'a [Dimension] {
        self.dimensions
    }

    /// Check the cancellation flag at a yield point. Once a strategy has
    /// seen it, the run counts as stopped early and this stays `true`.
    pub fn should_stop(&mut self) -> bool {
        if !self.stopped && self.cancel.is_cancelled() {
            self.stopped = true;
        }
        self.stopped
    }

    /// Whether a strategy gave up work because of cancellation.
    pub fn stopped_early(&self) -> bool {
        self.stopped
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn into_stats(self) -> RunStats {
        self.stats
    }

    /// Lookup-or-evaluate. `None` means the candidate produced no
    /// observation; the failure has already been logged and counted.
    pub async fn evaluate(&mut self, candidate: &[f64]) -> Option<f64> {
        let key = canonical_key(candidate);
        if let Some(report) = self.cache.lookup(&key) {
            self.stats.cache_hits += 1;
            debug!("Cache hit for [{}]: {}", key, report.fitness);
            return Some(report.fitness);
        }

        self.probe_pinned().await;

        self.stats.evaluations += 1;
        let outcome = match self.evaluator.evaluate(candidate).await {
            Ok(report) if report.fitness.is_nan() => {
                Err(EvaluationError::InvalidFitness { key: key.clone() })
            }
            other => other,
        };

        match outcome {
            Ok(report) => {
                let fitness = report.fitness;
                debug!("Evaluated [{}]: {}", key, fitness);
                self.cache.record(key, report);
                Some(fitness)
            }
            Err(err) => {
                self.stats.failures += 1;
                match &err {
                    EvaluationError::Timeout { .. } => self.stats.timeouts += 1,
                    EvaluationError::ParameterOutOfRange { .. } => self.stats.out_of_range += 1,
                    _ => {}
                }
                warn!("Skipping candidate [{}]: {}", key, err);
                None
            }
        }
    }

    /// Issue the forced refresh for `dimension` unless already done this run.
    pub async fn ensure_probed(&mut self, dimension: usize) {
        if !self.probed.insert(dimension) {
            return;
        }
        self.stats.probes += 1;
        if let Err(err) = self.evaluator.probe(dimension).await {
            warn!("Probe of pinned dimension {} failed: {}", dimension, err);
        }
    }

    async fn probe_pinned(&mut self) {
        let pinned: Vec<usize> = self
            .dimensions
            .iter()
            .enumerate()
            .filter(|(_, dim)| dim.is_pinned())
            .map(|(index, _)| index)
            .collect();
        for index in pinned {
            self.ensure_probed(index).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::FnEvaluator;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sweep_types::{EvalResult, Report};

    #[derive(Default)]
    struct Flaky {
        probes: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Evaluator for Flaky {
        async fn evaluate(&self, candidate: &[f64]) -> EvalResult<Report> {
            if candidate[0] < 0.0 {
                Err(EvaluationError::Timeout {
                    key: canonical_key(candidate),
                    waited_ms: 5000,
                })
            } else if candidate[0] > 100.0 {
                Ok(Report::new(f64::NAN))
            } else {
                Ok(Report::new(candidate[0] * 2.0))
            }
        }

        async fn probe(&self, dimension: usize) -> EvalResult<()> {
            self.probes.lock().push(dimension);
            Ok(())
        }
    }

    #[test]
    fn flag_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        assert!(!flag.is_cancelled());
        other.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn cancellation_counts_only_once_observed() {
        let evaluator = FnEvaluator::new(|x: &[f64]| x[0]);
        let cache = ResultCache::new();
        let dims = [Dimension::new(0.0, 1.0, 1.0)];
        let cancel = CancellationFlag::new();
        let mut ctx = SearchContext::new(&evaluator, &cache, cancel.clone(), &dims);

        assert!(!ctx.should_stop());
        cancel.cancel();
        assert!(!ctx.stopped_early());
        assert!(ctx.should_stop());
        assert!(ctx.stopped_early());
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let evaluator = FnEvaluator::new(|x: &[f64]| x[0]);
        let cache = ResultCache::new();
        let dims = [Dimension::new(0.0, 10.0, 1.0)];
        let mut ctx = SearchContext::new(&evaluator, &cache, CancellationFlag::new(), &dims);

        assert_eq!(ctx.evaluate(&[4.0]).await, Some(4.0));
        assert_eq!(ctx.evaluate(&[4.0]).await, Some(4.0));
        assert_eq!(ctx.stats().evaluations, 1);
        assert_eq!(ctx.stats().cache_hits, 1);
        assert!(cache.contains("4"));
    }

    #[tokio::test]
    async fn failures_are_absorbed_and_counted() {
        let evaluator = Flaky::default();
        let cache = ResultCache::new();
        let dims = [Dimension::new(-10.0, 200.0, 1.0)];
        let mut ctx = SearchContext::new(&evaluator, &cache, CancellationFlag::new(), &dims);

        assert_eq!(ctx.evaluate(&[-1.0]).await, None);
        assert_eq!(ctx.evaluate(&[150.0]).await, None);
        assert_eq!(ctx.evaluate(&[3.0]).await, Some(6.0));

        let stats = ctx.into_stats();
        assert_eq!(stats.evaluations, 3);
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn pinned_dimensions_are_probed_once() {
        let evaluator = Flaky::default();
        let cache = ResultCache::new();
        let dims = [Dimension::new(0.0, 5.0, 1.0), Dimension::new(7.0, 7.0, 0.0)];
        let mut ctx = SearchContext::new(&evaluator, &cache, CancellationFlag::new(), &dims);

        ctx.evaluate(&[1.0, 7.0]).await;
        ctx.evaluate(&[2.0, 7.0]).await;

        assert_eq!(*evaluator.probes.lock(), vec![1]);
        assert_eq!(ctx.stats().probes, 1);
    }
}
