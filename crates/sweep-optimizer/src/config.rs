//! Run configuration and algorithm hyperparameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sweep_types::{config_error, RangeSpec, SweepError, SweepResult};
use uuid::Uuid;

/// Unique optimization run identifier.
pub type OptimizationId = Uuid;

/// Which search strategy drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Traversal,
    Genetic,
    Bayesian,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Traversal => write!(f, "traversal"),
            Self::Genetic => write!(f, "genetic"),
            Self::Bayesian => write!(f, "bayesian"),
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "traversal" => Ok(Self::Traversal),
            "genetic" => Ok(Self::Genetic),
            "bayesian" => Ok(Self::Bayesian),
            other => Err(config_error!("unknown algorithm: {other}")),
        }
    }
}

/// Genetic algorithm hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneticParams {
    pub population_size: usize,
    pub max_iterations: usize,
    pub mutation_probability: f64,
}

impl GeneticParams {
    pub const MAX_POPULATION: usize = 1000;
    pub const MIN_ITERATIONS: usize = 10;
    pub const MUTATION_PROBABILITY: f64 = 0.1;

    /// Size the search from the total number of grid combinations.
    pub fn derive(total_combinations: f64) -> Self {
        let population = (total_combinations / 4.0).ceil().max(1.0);
        let population_size = (population as usize).min(Self::MAX_POPULATION);
        let iterations = ((total_combinations / population_size as f64) * 0.6).ceil();
        let max_iterations = (iterations as usize).max(Self::MIN_ITERATIONS);

        Self {
            population_size,
            max_iterations,
            mutation_probability: Self::MUTATION_PROBABILITY,
        }
    }

    pub fn validate(&self) -> SweepResult<()> {
        if self.population_size == 0 {
            return Err(config_error!("genetic population_size must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.mutation_probability) {
            return Err(config_error!(
                "mutation_probability must be within [0, 1], got {}",
                self.mutation_probability
            ));
        }
        Ok(())
    }
}

/// Optional per-field overrides of the derived genetic hyperparameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneticOverrides {
    pub population_size: Option<usize>,
    pub max_iterations: Option<usize>,
    pub mutation_probability: Option<f64>,
}

impl GeneticOverrides {
    pub fn apply(&self, derived: GeneticParams) -> GeneticParams {
        GeneticParams {
            population_size: self.population_size.unwrap_or(derived.population_size),
            max_iterations: self.max_iterations.unwrap_or(derived.max_iterations),
            mutation_probability: self
                .mutation_probability
                .unwrap_or(derived.mutation_probability),
        }
    }
}

/// Surrogate model and acquisition settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesianConfig {
    pub max_iterations: usize,
    pub kernel_bandwidth: f64,
    /// Exploration margin subtracted from the improvement.
    pub xi: f64,
    /// Below this best EI the best-known candidate is refined locally.
    pub ei_threshold: f64,
    /// Random candidates scored per acquisition step.
    pub candidate_pool: usize,
    /// Chance of a purely random candidate once samples exist.
    pub exploration_rate: f64,
}

impl Default for BayesianConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            kernel_bandwidth: 0.2,
            xi: 0.01,
            ei_threshold: 1e-6,
            candidate_pool: 50,
            exploration_rate: 0.1,
        }
    }
}

impl BayesianConfig {
    pub fn validate(&self) -> SweepResult<()> {
        if !(self.kernel_bandwidth > 0.0) {
            return Err(config_error!(
                "kernel_bandwidth must be positive, got {}",
                self.kernel_bandwidth
            ));
        }
        if !(0.0..=1.0).contains(&self.exploration_rate) {
            return Err(config_error!(
                "exploration_rate must be within [0, 1], got {}",
                self.exploration_rate
            ));
        }
        Ok(())
    }
}

/// Top-level configuration for an optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConfig {
    #[serde(default = "Uuid::new_v4")]
    pub id: OptimizationId,
    #[serde(default)]
    pub name: String,

    pub algorithm: Algorithm,

    /// Raw range specs, one per dimension, in dimension order.
    pub dimensions: Vec<RangeSpec>,

    #[serde(default)]
    pub genetic: GeneticOverrides,

    #[serde(default)]
    pub bayesian: BayesianConfig,

    /// Fixed RNG seed for reproducible genetic and Bayesian runs.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl OptimizationConfig {
    pub fn new(name: impl Into<String>, algorithm: Algorithm, dimensions: Vec<RangeSpec>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            algorithm,
            dimensions,
            genetic: GeneticOverrides::default(),
            bayesian: BayesianConfig::default(),
            seed: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_genetic(mut self, overrides: GeneticOverrides) -> Self {
        self.genetic = overrides;
        self
    }

    pub fn with_bayesian(mut self, config: BayesianConfig) -> Self {
        self.bayesian = config;
        self
    }

    pub fn with_bayesian_iterations(mut self, max_iterations: usize) -> Self {
        self.bayesian.max_iterations = max_iterations;
        self
    }

    pub fn from_json(text: &str) -> SweepResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
