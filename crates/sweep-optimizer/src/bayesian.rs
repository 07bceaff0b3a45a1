//! Sequential surrogate-model search.
//!
//! The surrogate is a Gaussian-kernel weighted average over every observed
//! sample. Candidates are picked by maximizing Expected Improvement over a
//! pool of uniform draws, with occasional forced exploration and local
//! refinement of the best-known point when the acquisition stagnates.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, SQRT_2};
use sweep_types::{BestResult, Dimension, ParameterVector};
use tracing::{debug, info};

use crate::config::BayesianConfig;
use crate::context::SearchContext;
use crate::genetic::random_candidate;

/// Variance floor keeping the surrogate from collapsing to zero width.
const VARIANCE_FLOOR: f64 = 1e-6;

/// Standard normal probability density.
pub fn gaussian_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Standard normal cumulative distribution (Abramowitz and Stegun 7.1.26).
pub fn gaussian_cdf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let z = x.abs() / SQRT_2;
    let t = 1.0 / (1.0 + P * z);
    let y = 1.0 - ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t * (-z * z).exp();
    0.5 * (1.0 + sign * y)
}

/// One observation used to fit the surrogate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub parameters: ParameterVector,
    pub fitness: f64,
}

/// Surrogate mean and standard deviation at a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurrogateEstimate {
    pub mu: f64,
    pub sigma: f64,
}

impl SurrogateEstimate {
    /// Maximally uncertain prior used before any sample exists.
    pub const PRIOR: Self = Self { mu: 0.0, sigma: 1.0 };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Acquisition {
    pub mu: f64,
    pub sigma: f64,
    pub expected_improvement: f64,
}

/// Surrogate-model optimizer state for one run.
pub struct BayesianOptimizer {
    dims: Vec<Dimension>,
    config: BayesianConfig,
    rng: StdRng,
    samples: Vec<Sample>,
    best: BestResult,
}

impl BayesianOptimizer {
    pub fn new(dims: &[Dimension], config: BayesianConfig, rng: StdRng) -> Self {
        Self {
            dims: dims.to_vec(),
            config,
            rng,
            samples: Vec::new(),
            best: BestResult::empty(),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn best(&self) -> &BestResult {
        &self.best
    }

    pub fn random_candidate(&mut self) -> ParameterVector {
        random_candidate(&self.dims, &mut self.rng)
    }

    /// Nudge each component by up to 5% of its range, rounded then clamped.
    pub fn perturb_candidate(&mut self, candidate: &[f64]) -> ParameterVector {
        candidate
            .iter()
            .zip(&self.dims)
            .map(|(value, dim)| {
                let shift = (self.rng.random::<f64>() - 0.5) * 0.1 * dim.span();
                dim.round(value + shift).clamp(dim.start, dim.end)
            })
            .collect()
    }

    /// Kernel-weighted mean and spread of observed fitness around `x`.
    pub fn surrogate_estimate(&self, x: &[f64]) -> SurrogateEstimate {
        if self.samples.is_empty() {
            return SurrogateEstimate::PRIOR;
        }

        let bandwidth = self.config.kernel_bandwidth;
        let mut weight_total = 0.0;
        let mut weighted_sum = 0.0;
        let mut weighted_squares = 0.0;

        for sample in &self.samples {
            let distance_squared: f64 = x
                .iter()
                .zip(&sample.parameters)
                .zip(&self.dims)
                .map(|((a, b), dim)| {
                    let range = if dim.span() > 0.0 { dim.span() } else { 1.0 };
                    let diff = (a - b) / range;
                    diff * diff
                })
                .sum();
            let weight = (-distance_squared / (2.0 * bandwidth * bandwidth)).exp();
            weight_total += weight;
            weighted_sum += weight * sample.fitness;
            weighted_squares += weight * sample.fitness * sample.fitness;
        }

        // Every sample far outside the kernel: nothing is known here.
        if weight_total <= f64::MIN_POSITIVE {
            return SurrogateEstimate::PRIOR;
        }

        let mu = weighted_sum / weight_total;
        let variance = weighted_squares / weight_total - mu * mu;
        SurrogateEstimate {
            mu,
            sigma: variance.max(VARIANCE_FLOOR).sqrt(),
        }
    }

    /// Expected Improvement over the best fitness seen so far.
    pub fn acquisition(&self, x: &[f64]) -> Acquisition {
        let SurrogateEstimate { mu, sigma } = self.surrogate_estimate(x);
        let improvement = mu - self.best.fitness - self.config.xi;
        let expected_improvement = if sigma > 0.0 {
            let z = improvement / sigma;
            improvement * gaussian_cdf(z) + sigma * gaussian_pdf(z)
        } else {
            0.0
        };
        Acquisition {
            mu,
            sigma,
            expected_improvement,
        }
    }

    /// Choose the next candidate to evaluate.
    pub fn next_candidate(&mut self) -> ParameterVector {
        if self.samples.is_empty() {
            return self.random_candidate();
        }
        if self.rng.random::<f64>() < self.config.exploration_rate {
            debug!("Exploring with a random candidate");
            return self.random_candidate();
        }

        let mut chosen: Option<ParameterVector> = None;
        let mut chosen_ei = f64::NEG_INFINITY;
        for _ in 0..self.config.candidate_pool {
            let candidate = self.random_candidate();
            let ei = self.acquisition(&candidate).expected_improvement;
            if ei > chosen_ei {
                chosen_ei = ei;
                chosen = Some(candidate);
            }
        }

        if chosen_ei < self.config.ei_threshold && self.best.is_found() {
            debug!(
                "Best EI {} below threshold {}, refining best candidate",
                chosen_ei, self.config.ei_threshold
            );
            let anchor = self.best.parameters.clone();
            return self.perturb_candidate(&anchor);
        }

        match chosen {
            Some(candidate) => candidate,
            None => self.random_candidate(),
        }
    }

    /// Record an observation. Samples are never discarded.
    pub fn update(&mut self, parameters: ParameterVector, fitness: f64) {
        if self.best.offer(&parameters, fitness) {
            info!("New best {:?} -> {}", parameters, fitness);
        }
        self.samples.push(Sample {
            parameters,
            fitness,
        });
    }

    /// Run up to `max_iterations` evaluate-update rounds.
    pub async fn run(mut self, ctx: &mut SearchContext<'_>) -> BestResult {
        info!(
            "Starting Bayesian search: {} iterations, bandwidth {}, xi {}",
            self.config.max_iterations, self.config.kernel_bandwidth, self.config.xi
        );

        for iteration in 0..self.config.max_iterations {
            if ctx.should_stop() {
                debug!("Bayesian search cancelled at iteration {}", iteration);
                break;
            }
            let candidate = self.next_candidate();
            if let Some(fitness) = ctx.evaluate(&candidate).await {
                self.update(candidate, fitness);
            }
        }

        self.best
    }
}
