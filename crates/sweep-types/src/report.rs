//! Evaluation reports and best-result tracking.

use serde::{Deserialize, Serialize};

/// One value per dimension, in dimension order.
pub type ParameterVector = Vec<f64>;

/// What an evaluator hands back for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub fitness: f64,
    /// Raw metrics from the system under test; opaque to the optimizer.
    #[serde(default)]
    pub metrics: serde_json::Value,
}

impl Report {
    pub fn new(fitness: f64) -> Self {
        Self {
            fitness,
            metrics: serde_json::Value::Null,
        }
    }

    pub fn with_metrics(mut self, metrics: serde_json::Value) -> Self {
        self.metrics = metrics;
        self
    }
}

/// Best candidate seen so far. Starts empty at negative infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestResult {
    pub parameters: ParameterVector,
    #[serde(with = "fitness_repr")]
    pub fitness: f64,
}

impl BestResult {
    pub fn empty() -> Self {
        Self {
            parameters: Vec::new(),
            fitness: f64::NEG_INFINITY,
        }
    }

    /// Replace the current best only on a strictly greater fitness.
    pub fn offer(&mut self, parameters: &[f64], fitness: f64) -> bool {
        if fitness > self.fitness {
            self.parameters = parameters.to_vec();
            self.fitness = fitness;
            true
        } else {
            false
        }
    }

    pub fn is_found(&self) -> bool {
        self.fitness > f64::NEG_INFINITY
    }
}

impl Default for BestResult {
    fn default() -> Self {
        Self::empty()
    }
}

/// JSON has no infinity; an empty best serializes its fitness as `null`.
mod fitness_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}
