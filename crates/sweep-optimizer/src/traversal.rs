//! Exhaustive grid traversal.
//!
//! The highest dimension index is the outermost loop and dimension 0 the
//! innermost. Grid values are computed from the step index rather than by
//! repeated addition, then rounded to each dimension's precision.

use std::future::Future;
use std::pin::Pin;
use sweep_types::{BestResult, Dimension};
use tracing::{debug, info};

use crate::context::SearchContext;
use crate::space::total_combinations;

/// Values visited along one dimension, in order, computed on demand.
pub fn sweep_values(dim: &Dimension) -> SweepValues<'_> {
    let step = dim.sweep_step();
    SweepValues {
        dim,
        step,
        tolerance: step * 1e-9,
        index: 0,
        previous: None,
    }
}

/// Iterator over one dimension's grid. Values are rounded and clamped to the
/// range; a value equal to the one before it is skipped.
#[derive(Debug, Clone)]
pub struct SweepValues<'d> {
    dim: &'d Dimension,
    step: f64,
    tolerance: f64,
    index: u64,
    previous: Option<f64>,
}

impl Iterator for SweepValues<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        loop {
            let raw = self.dim.start + self.index as f64 * self.step;
            if raw > self.dim.end + self.tolerance {
                return None;
            }
            self.index += 1;

            let value = self.dim.round(raw).clamp(self.dim.start, self.dim.end);
            if self.previous != Some(value) {
                self.previous = Some(value);
                return Some(value);
            }
        }
    }
}

/// Visit every grid cell and return the best observation.
pub async fn traverse(ctx: &mut SearchContext<'_>) -> BestResult {
    let dims = ctx.dimensions();
    if dims.is_empty() {
        return BestResult::empty();
    }

    info!(
        "Starting grid traversal over {} dimensions ({} cells)",
        dims.len(),
        total_combinations(dims)
    );

    let mut walk = GridWalk {
        dims,
        current: dims.iter().map(|dim| dim.start).collect(),
        best: BestResult::empty(),
    };
    walk.descend(ctx, dims.len() - 1).await;
    walk.best
}

struct GridWalk<'d> {
    dims: &'d [Dimension],
    current: Vec<f64>,
    best: BestResult,
}

impl<'d> GridWalk<'d> {
    fn descend<'w, 'a: 'w>(
        &'w mut self,
        ctx: &'w mut SearchContext<'a>,
        index: usize,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'w>>
    where
        'd: 'w,
    {
        Box::pin(async move {
            if ctx.should_stop() {
                debug!("Traversal cancelled at dimension {}", index);
                return;
            }

            if index == 0 {
                self.sweep_innermost(ctx).await;
                return;
            }

            let dims = self.dims;
            for value in sweep_values(&dims[index]) {
                self.current[index] = value;
                self.descend(ctx, index - 1).await;
                if ctx.stopped_early() {
                    return;
                }
            }
        })
    }

    async fn sweep_innermost(&mut self, ctx: &mut SearchContext<'_>) {
        let dims = self.dims;
        if dims[0].is_pinned() {
            ctx.ensure_probed(0).await;
        }

        for value in sweep_values(&dims[0]) {
            if ctx.should_stop() {
                return;
            }
            self.current[0] = value;
            if let Some(fitness) = ctx.evaluate(&self.current).await {
                if self.best.offer(&self.current, fitness) {
                    debug!("New best {:?} -> {}", self.current, fitness);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use crate::context::CancellationFlag;
    use crate::evaluator::{Evaluator, FnEvaluator};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use sweep_types::{EvalResult, Report};

    /// Records every candidate it sees and scores with `score`.
    struct Recorder {
        seen: Mutex<Vec<Vec<f64>>>,
        probes: Mutex<usize>,
        score: fn(&[f64]) -> f64,
    }

    impl Recorder {
        fn new(score: fn(&[f64]) -> f64) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                probes: Mutex::new(0),
                score,
            }
        }
    }

    #[async_trait]
    impl Evaluator for Recorder {
        async fn evaluate(&self, candidate: &[f64]) -> EvalResult<Report> {
            self.seen.lock().push(candidate.to_vec());
            Ok(Report::new((self.score)(candidate)))
        }

        async fn probe(&self, _dimension: usize) -> EvalResult<()> {
            *self.probes.lock() += 1;
            Ok(())
        }
    }

    async fn run(dims: &[Dimension], evaluator: &Recorder, cancel: CancellationFlag) -> BestResult {
        let cache = ResultCache::new();
        let mut ctx = SearchContext::new(evaluator, &cache, cancel, dims);
        traverse(&mut ctx).await
    }

    #[test]
    fn sweep_values_avoid_drift() {
        let dim = Dimension::new(0.0, 1.0, 0.1);
        let values: Vec<f64> = sweep_values(&dim).collect();
        assert_eq!(values.len(), 11);
        assert_eq!(values[3], 0.3);
        assert_eq!(values[10], 1.0);
    }

    #[test]
    fn pinned_dimension_sweeps_once_when_degenerate() {
        let values: Vec<f64> = sweep_values(&Dimension::new(5.0, 5.0, 0.0)).collect();
        assert_eq!(values, vec![5.0]);
    }

    #[test]
    fn sweep_values_are_lazy_and_clamped() {
        let huge = Dimension::new(0.0, 1e12, 1.0);
        assert_eq!(sweep_values(&huge).take(3).collect::<Vec<_>>(), vec![0.0, 1.0, 2.0]);

        let off_grid = Dimension::new(0.4, 2.5, 1.0);
        assert_eq!(sweep_values(&off_grid).collect::<Vec<_>>(), vec![0.4, 1.0, 2.0]);
    }

    #[tokio::test]
    async fn single_dimension_in_order() {
        let evaluator = Recorder::new(|x| x[0]);
        let best = run(&[Dimension::new(0.0, 2.0, 1.0)], &evaluator, CancellationFlag::new()).await;

        assert_eq!(*evaluator.seen.lock(), vec![vec![0.0], vec![1.0], vec![2.0]]);
        assert_eq!(best.parameters, vec![2.0]);
        assert_eq!(best.fitness, 2.0);
    }

    #[tokio::test]
    async fn highest_dimension_is_outermost() {
        let evaluator = Recorder::new(|_| 0.0);
        let dims = [Dimension::new(0.0, 1.0, 1.0), Dimension::new(10.0, 11.0, 1.0)];
        run(&dims, &evaluator, CancellationFlag::new()).await;

        assert_eq!(
            *evaluator.seen.lock(),
            vec![
                vec![0.0, 10.0],
                vec![1.0, 10.0],
                vec![0.0, 11.0],
                vec![1.0, 11.0],
            ]
        );
    }

    #[tokio::test]
    async fn pinned_dimension_still_probes_and_evaluates() {
        let evaluator = Recorder::new(|_| 1.0);
        let best = run(&[Dimension::new(5.0, 5.0, 0.0)], &evaluator, CancellationFlag::new()).await;

        assert_eq!(*evaluator.probes.lock(), 1);
        assert_eq!(*evaluator.seen.lock(), vec![vec![5.0]]);
        assert_eq!(best.parameters, vec![5.0]);
    }

    #[tokio::test]
    async fn cancelled_run_does_nothing() {
        let evaluator = Recorder::new(|_| 1.0);
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let best = run(&[Dimension::new(0.0, 10.0, 1.0)], &evaluator, cancel).await;

        assert!(evaluator.seen.lock().is_empty());
        assert_eq!(best.fitness, f64::NEG_INFINITY);
    }

    #[tokio::test]
    async fn cancelled_run_over_a_huge_grid_returns_at_once() {
        let evaluator = Recorder::new(|_| 1.0);
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let dims = [Dimension::new(0.0, 1e12, 1.0), Dimension::new(0.0, 1e12, 1.0)];
        let best = run(&dims, &evaluator, cancel).await;

        assert!(evaluator.seen.lock().is_empty());
        assert!(!best.is_found());
    }

    #[tokio::test]
    async fn cancellation_mid_sweep_stops_every_level() {
        let cancel = CancellationFlag::new();
        let on_third = cancel.clone();
        let evaluator = FnEvaluator::new(move |x: &[f64]| {
            if x[0] == 2.0 {
                on_third.cancel();
            }
            x[0]
        });
        let dims = [Dimension::new(0.0, 1e12, 1.0), Dimension::new(0.0, 1e12, 1.0)];
        let cache = ResultCache::new();
        let mut ctx = SearchContext::new(&evaluator, &cache, cancel, &dims);

        let best = traverse(&mut ctx).await;

        assert!(ctx.stopped_early());
        assert_eq!(ctx.stats().evaluations, 3);
        assert_eq!(best.parameters, vec![2.0, 0.0]);
    }

    #[tokio::test]
    async fn every_value_respects_bounds_and_precision() {
        let evaluator = Recorder::new(|_| 0.0);
        let dims = [Dimension::new(0.05, 0.5, 0.15), Dimension::new(-1.0, 1.0, 0.5)];
        run(&dims, &evaluator, CancellationFlag::new()).await;

        for candidate in evaluator.seen.lock().iter() {
            for (value, dim) in candidate.iter().zip(&dims) {
                assert!(dim.contains(*value), "{value} outside {dim:?}");
                assert_eq!(dim.round(*value), *value);
            }
        }
    }
}
