//! The collaborator contract: something that scores a candidate.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use sweep_types::{canonical_key, Dimension, EvalResult, EvaluationError, Report};
use tracing::debug;

/// Scores one parameter vector at a time.
///
/// Calls may be slow and may fail. The optimizer never issues two calls
/// concurrently.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, candidate: &[f64]) -> EvalResult<Report>;

    /// Forced refresh for a pinned (zero-step) dimension. Issued once per run
    /// before the first real evaluation.
    async fn probe(&self, _dimension: usize) -> EvalResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: Evaluator + ?Sized> Evaluator for Arc<T> {
    async fn evaluate(&self, candidate: &[f64]) -> EvalResult<Report> {
        (**self).evaluate(candidate).await
    }

    async fn probe(&self, dimension: usize) -> EvalResult<()> {
        (**self).probe(dimension).await
    }
}

// ---- Pure function evaluator ----

/// Adapts a plain fitness function.
pub struct FnEvaluator<F> {
    func: F,
}

impl<F> FnEvaluator<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Evaluator for FnEvaluator<F>
where
    F: Fn(&[f64]) -> f64 + Send + Sync,
{
    async fn evaluate(&self, candidate: &[f64]) -> EvalResult<Report> {
        Ok(Report::new((self.func)(candidate)))
    }
}

// ---- Guarded evaluator ----

/// Default delay before each request, letting the external system settle.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(300);

/// Default bounded wait for a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Wraps an evaluator that fronts a single stateful external resource.
///
/// Requests are serialized, each one waits `settle` first, and each one is
/// abandoned after `timeout`. Candidates outside the configured dimensions
/// are refused before reaching the inner evaluator.
pub struct GuardedEvaluator<E> {
    inner: E,
    dimensions: Vec<Dimension>,
    settle: Duration,
    timeout: Duration,
    in_flight: tokio::sync::Mutex<()>,
}

impl<E: Evaluator> GuardedEvaluator<E> {
    pub fn new(inner: E, dimensions: Vec<Dimension>) -> Self {
        Self {
            inner,
            dimensions,
            settle: DEFAULT_SETTLE,
            timeout: DEFAULT_TIMEOUT,
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn into_inner(self) -> E {
        self.inner
    }

    fn check_bounds(&self, candidate: &[f64]) -> EvalResult<()> {
        for (dimension, (value, dim)) in candidate.iter().zip(&self.dimensions).enumerate() {
            if !dim.contains(*value) {
                return Err(EvaluationError::ParameterOutOfRange {
                    dimension,
                    value: *value,
                    start: dim.start,
                    end: dim.end,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Evaluator> Evaluator for GuardedEvaluator<E> {
    async fn evaluate(&self, candidate: &[f64]) -> EvalResult<Report> {
        self.check_bounds(candidate)?;

        let _turn = self.in_flight.lock().await;
        tokio::time::sleep(self.settle).await;

        match tokio::time::timeout(self.timeout, self.inner.evaluate(candidate)).await {
            Ok(result) => result,
            Err(_) => {
                let key = canonical_key(candidate);
                debug!("Evaluation of [{}] exceeded {:?}", key, self.timeout);
                Err(EvaluationError::Timeout {
                    key,
                    waited_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn probe(&self, dimension: usize) -> EvalResult<()> {
        let _turn = self.in_flight.lock().await;
        match tokio::time::timeout(self.timeout, self.inner.probe(dimension)).await {
            Ok(result) => result,
            Err(_) => Err(EvaluationError::Timeout {
                key: format!("probe {dimension}"),
                waited_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
