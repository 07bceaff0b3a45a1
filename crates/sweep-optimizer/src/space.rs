//! The validated search space.

use serde::{Deserialize, Serialize};
use sweep_types::{parse_dimensions, Dimension, DimensionError, RangeSpec};

use crate::config::Algorithm;

/// Ordered dimensions plus the size of their grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    pub dimensions: Vec<Dimension>,
    /// Product of per-dimension combination counts. Only used to size the
    /// genetic search; traversal walks the grid regardless.
    pub total_combinations: f64,
}

impl ParameterSpace {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        let total_combinations = total_combinations(&dimensions);
        Self {
            dimensions,
            total_combinations,
        }
    }

    /// Parse raw specs and apply the checks `algorithm` needs.
    pub fn from_specs(specs: &[RangeSpec], algorithm: Algorithm) -> Result<Self, DimensionError> {
        let dimensions = parse_dimensions(specs)?;
        if matches!(algorithm, Algorithm::Traversal | Algorithm::Genetic) {
            for (index, dim) in dimensions.iter().enumerate() {
                dim.require_stepped_span(index)?;
            }
        }
        Ok(Self::new(dimensions))
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

/// Product of every dimension's combination count.
pub fn total_combinations(dimensions: &[Dimension]) -> f64 {
    dimensions.iter().map(Dimension::combinations).product()
}
