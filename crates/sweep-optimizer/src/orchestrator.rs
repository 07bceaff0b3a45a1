//! Strategy selection and run lifecycle.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sweep_types::{BestResult, SweepResult};
use tracing::{info, warn};

use crate::bayesian::BayesianOptimizer;
use crate::cache::ResultCache;
use crate::config::{Algorithm, BayesianConfig, GeneticParams, OptimizationConfig, OptimizationId};
use crate::context::{CancellationFlag, RunStats, SearchContext};
use crate::evaluator::Evaluator;
use crate::genetic::GeneticSearch;
use crate::space::ParameterSpace;
use crate::traversal::traverse;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationState {
    Completed,
    Cancelled,
}

/// Everything a finished run reports back. The cache contents are handed
/// over separately by whoever owns the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub optimization_id: OptimizationId,
    pub algorithm: Algorithm,
    pub state: OptimizationState,
    pub best: BestResult,
    pub total_combinations: f64,
    pub genetic: Option<GeneticParams>,
    pub stats: RunStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl OptimizationOutcome {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Strategy chosen for a run, with its resolved hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlannedStrategy {
    Traversal,
    Genetic(GeneticParams),
    Bayesian(BayesianConfig),
}

/// Validated plan for a run: the space and the strategy to run over it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub space: ParameterSpace,
    pub strategy: PlannedStrategy,
}

impl RunPlan {
    pub fn genetic(&self) -> Option<GeneticParams> {
        match self.strategy {
            PlannedStrategy::Genetic(params) => Some(params),
            _ => None,
        }
    }
}

/// Drives one configured optimization.
#[derive(Debug, Clone)]
pub struct Optimizer {
    config: OptimizationConfig,
}

impl Optimizer {
    pub fn new(config: OptimizationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizationConfig {
        &self.config
    }

    /// Validate dimensions and derive hyperparameters without evaluating.
    pub fn plan(&self) -> SweepResult<RunPlan> {
        let space = ParameterSpace::from_specs(&self.config.dimensions, self.config.algorithm)?;

        let strategy = match self.config.algorithm {
            Algorithm::Genetic => {
                let params = self
                    .config
                    .genetic
                    .apply(GeneticParams::derive(space.total_combinations));
                params.validate()?;
                PlannedStrategy::Genetic(params)
            }
            Algorithm::Bayesian => {
                self.config.bayesian.validate()?;
                PlannedStrategy::Bayesian(self.config.bayesian)
            }
            Algorithm::Traversal => PlannedStrategy::Traversal,
        };

        Ok(RunPlan { space, strategy })
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Run the configured strategy to completion or cancellation.
    ///
    /// Only configuration problems are returned as errors, and always before
    /// the first evaluation.
    pub async fn run(
        &self,
        evaluator: &dyn Evaluator,
        cache: &ResultCache,
        cancel: CancellationFlag,
    ) -> SweepResult<OptimizationOutcome> {
        let plan = self.plan()?;
        let started_at = Utc::now();
        info!(
            "Starting {} optimization '{}' over {} dimensions ({} combinations)",
            self.config.algorithm,
            self.config.name,
            plan.space.len(),
            plan.space.total_combinations
        );

        let mut ctx = SearchContext::new(evaluator, cache, cancel, &plan.space.dimensions);
        let best = match plan.strategy {
            PlannedStrategy::Traversal => traverse(&mut ctx).await,
            PlannedStrategy::Genetic(params) => {
                GeneticSearch::new(params, &plan.space.dimensions, self.rng())
                    .run(&mut ctx)
                    .await
            }
            PlannedStrategy::Bayesian(config) => {
                BayesianOptimizer::new(&plan.space.dimensions, config, self.rng())
                    .run(&mut ctx)
                    .await
            }
        };
        let stopped_early = ctx.stopped_early();
        let stats = ctx.into_stats();

        let state = if stopped_early {
            warn!("Optimization '{}' stopped by cancellation", self.config.name);
            OptimizationState::Cancelled
        } else {
            OptimizationState::Completed
        };

        info!(
            "Optimization '{}' finished: best {:?} -> {} ({} evaluations, {} cache hits, {} failures)",
            self.config.name,
            best.parameters,
            best.fitness,
            stats.evaluations,
            stats.cache_hits,
            stats.failures
        );

        Ok(OptimizationOutcome {
            optimization_id: self.config.id,
            algorithm: self.config.algorithm,
            state,
            best,
            total_combinations: plan.space.total_combinations,
            genetic: plan.genetic(),
            stats,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
