//! Population-based search: selection, arithmetic crossover, resampling mutation.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sweep_types::{decimal_places, round_to, BestResult, Dimension, ParameterVector};
use tracing::{debug, info};

use crate::config::GeneticParams;
use crate::context::SearchContext;

/// A candidate together with its evaluated fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationMember {
    pub parameters: ParameterVector,
    /// Zero until evaluated; negative infinity when evaluation failed.
    pub fitness: f64,
}

impl PopulationMember {
    pub fn new(parameters: ParameterVector) -> Self {
        Self {
            parameters,
            fitness: 0.0,
        }
    }
}

/// Uniform draw inside every dimension, rounded to its precision.
pub fn random_candidate(dims: &[Dimension], rng: &mut impl Rng) -> ParameterVector {
    dims.iter()
        .map(|dim| dim.scale_unit(rng.random::<f64>()))
        .collect()
}

/// Component-wise mean of two parents.
///
/// Each component is rounded to the number of decimals in the first parent's
/// own value, not to the dimension's step precision.
pub fn crossover(first: &[f64], second: &[f64]) -> ParameterVector {
    first
        .iter()
        .zip(second)
        .map(|(a, b)| round_to((a + b) / 2.0, decimal_places(*a)))
        .collect()
}

/// Replace every component with a fresh uniform draw.
pub fn mutate(child: &mut [f64], dims: &[Dimension], rng: &mut impl Rng) {
    for (value, dim) in child.iter_mut().zip(dims) {
        *value = dim.scale_unit(rng.random::<f64>());
    }
}

/// One genetic algorithm invocation.
pub struct GeneticSearch {
    params: GeneticParams,
    rng: StdRng,
    population: Vec<PopulationMember>,
    best: BestResult,
}

impl GeneticSearch {
    /// Seed a random initial population of `population_size` members.
    pub fn new(params: GeneticParams, dims: &[Dimension], mut rng: StdRng) -> Self {
        let population = (0..params.population_size)
            .map(|_| PopulationMember::new(random_candidate(dims, &mut rng)))
            .collect();
        Self::with_population(params, population, rng)
    }

    pub fn with_population(
        params: GeneticParams,
        population: Vec<PopulationMember>,
        rng: StdRng,
    ) -> Self {
        Self {
            params,
            rng,
            population,
            best: BestResult::empty(),
        }
    }

    pub fn population(&self) -> &[PopulationMember] {
        &self.population
    }

    pub fn best(&self) -> &BestResult {
        &self.best
    }

    /// Evaluate every member, sort by fitness descending and truncate to
    /// `population_size`. Returns `false` if cancelled part-way, leaving the
    /// population unsorted.
    pub async fn selection(&mut self, ctx: &mut SearchContext<'_>) -> bool {
        for member in self.population.iter_mut() {
            if ctx.should_stop() {
                return false;
            }
            member.fitness = ctx
                .evaluate(&member.parameters)
                .await
                .unwrap_or(f64::NEG_INFINITY);
        }

        self.population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        self.population.truncate(self.params.population_size);
        true
    }

    /// Append `population_size` children bred from the current survivors.
    pub fn reproduce(&mut self, dims: &[Dimension]) {
        let survivors = self.population.len();
        if survivors == 0 {
            return;
        }

        let mut children = Vec::with_capacity(self.params.population_size);
        for _ in 0..self.params.population_size {
            let first = &self.population[self.rng.random_range(0..survivors)];
            let second = &self.population[self.rng.random_range(0..survivors)];
            let mut child = crossover(&first.parameters, &second.parameters);
            if self.rng.random::<f64>() < self.params.mutation_probability {
                mutate(&mut child, dims, &mut self.rng);
            }
            children.push(PopulationMember::new(child));
        }
        self.population.extend(children);
    }

    fn track_best(&mut self, generation: usize) {
        if let Some(top) = self.population.first() {
            if self.best.offer(&top.parameters, top.fitness) {
                info!(
                    "Generation {}: new best {:?} -> {}",
                    generation, self.best.parameters, self.best.fitness
                );
            }
        }
    }

    /// Run up to `max_iterations` generations.
    pub async fn run(mut self, ctx: &mut SearchContext<'_>) -> BestResult {
        let dims = ctx.dimensions();
        info!(
            "Starting genetic search: population {}, {} generations, mutation {}",
            self.params.population_size, self.params.max_iterations, self.params.mutation_probability
        );

        for generation in 0..self.params.max_iterations {
            if !self.selection(ctx).await {
                debug!("Genetic search cancelled during generation {}", generation);
                break;
            }
            self.track_best(generation);

            if generation + 1 == self.params.max_iterations {
                break;
            }
            if ctx.should_stop() {
                debug!("Genetic search cancelled after generation {}", generation);
                break;
            }
            self.reproduce(dims);
        }

        self.best
    }
}
