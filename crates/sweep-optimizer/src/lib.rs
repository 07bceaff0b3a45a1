//! # sweep-optimizer
//!
//! Parameter search over bounded, stepped spaces for Sweep.
//!
//! Provides the search space descriptor, a memoizing result cache, the
//! evaluator contract, three interchangeable strategies (exhaustive grid
//! traversal, genetic evolution, Bayesian surrogate search) and the
//! orchestrator that validates a run, picks the strategy and reports the
//! best result.

mod bayesian;
mod cache;
mod config;
mod context;
mod evaluator;
mod genetic;
mod orchestrator;
mod space;
mod traversal;

pub use bayesian::{
    gaussian_cdf, gaussian_pdf, Acquisition, BayesianOptimizer, Sample, SurrogateEstimate,
};
pub use cache::{CacheStats, ResultCache};
pub use config::{
    Algorithm, BayesianConfig, GeneticOverrides, GeneticParams, OptimizationConfig,
    OptimizationId,
};
pub use context::{CancellationFlag, RunStats, SearchContext};
pub use evaluator::{Evaluator, FnEvaluator, GuardedEvaluator, DEFAULT_SETTLE, DEFAULT_TIMEOUT};
pub use genetic::{crossover, mutate, random_candidate, GeneticSearch, PopulationMember};
pub use orchestrator::{
    OptimizationOutcome, OptimizationState, Optimizer, PlannedStrategy, RunPlan,
};
pub use space::{total_combinations, ParameterSpace};
pub use traversal::{sweep_values, traverse, SweepValues};
