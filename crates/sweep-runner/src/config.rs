//! Run file format for the `sweep` binary.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use sweep_optimizer::OptimizationConfig;
use sweep_types::SweepResult;

/// External program used as the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    /// Fixed arguments placed before the candidate values.
    #[serde(default)]
    pub args: Vec<String>,
    /// Arguments for the pinned-dimension refresh. The dimension index is
    /// appended. No probe command is run when absent.
    #[serde(default)]
    pub probe_args: Option<Vec<String>>,
}

/// Everything the runner needs for one optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub optimization: OptimizationConfig,
    pub command: CommandSpec,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_settle_ms() -> u64 {
    sweep_optimizer::DEFAULT_SETTLE.as_millis() as u64
}

fn default_timeout_ms() -> u64 {
    sweep_optimizer::DEFAULT_TIMEOUT.as_millis() as u64
}

impl RunnerConfig {
    pub fn load(path: impl AsRef<Path>) -> SweepResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> SweepResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
