use thiserror::Error;

/// Main error type for the Sweep system
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Dimension error: {0}")]
    Dimension(#[from] DimensionError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Which field of a raw range spec failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeField {
    Start,
    End,
    Step,
}

impl std::fmt::Display for RangeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
            Self::Step => write!(f, "step"),
        }
    }
}

/// Malformed or inconsistent range input. Fatal to starting a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DimensionError {
    #[error("No dimensions configured")]
    Empty,

    #[error("Dimension {index}: {field} is not a number: {raw:?}")]
    NotANumber {
        index: usize,
        field: RangeField,
        raw: String,
    },

    #[error("Dimension {index}: {field} must be finite")]
    NonFinite { index: usize, field: RangeField },

    #[error("Dimension {index}: step must not be negative, got {step}")]
    NegativeStep { index: usize, step: f64 },

    #[error("Dimension {index}: start {start} is after end {end}")]
    InvertedRange { index: usize, start: f64, end: f64 },

    #[error("Dimension {index}: stepped range is empty, start {start} must be before end {end} when step is {step}")]
    EmptySteppedRange {
        index: usize,
        start: f64,
        end: f64,
        step: f64,
    },
}

/// Per-candidate failures reported by an evaluator. Never fatal to a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Evaluation of [{key}] timed out after {waited_ms} ms")]
    Timeout { key: String, waited_ms: u64 },

    #[error("Parameter {dimension} value {value} is outside [{start}, {end}]")]
    ParameterOutOfRange {
        dimension: usize,
        value: f64,
        start: f64,
        end: f64,
    },

    #[error("Evaluator returned a non-numeric fitness for [{key}]")]
    InvalidFitness { key: String },

    #[error("Evaluation failed: {message}")]
    Failed { message: String },
}

impl EvaluationError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Result type alias for Sweep operations
pub type SweepResult<T> = Result<T, SweepError>;

/// Result alias for a single evaluator call.
pub type EvalResult<T> = Result<T, EvaluationError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::SweepError::Config(format!($($arg)*))
    };
}
