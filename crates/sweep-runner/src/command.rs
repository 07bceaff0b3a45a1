//! Evaluator backed by an external program.
//!
//! The program receives the candidate values as trailing arguments and prints
//! its result on the last non-empty stdout line: either a bare number or a
//! JSON object with a numeric `fitness` field plus any other metrics.

use async_trait::async_trait;
use std::process::Output;
use sweep_optimizer::Evaluator;
use sweep_types::{EvalResult, EvaluationError, Report};
use tokio::process::Command;
use tracing::debug;

use crate::config::CommandSpec;

pub struct CommandEvaluator {
    spec: CommandSpec,
}

impl CommandEvaluator {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    async fn execute(&self, args: &[String]) -> EvalResult<Output> {
        let output = Command::new(&self.spec.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EvaluationError::failed(format!("{}: {e}", self.spec.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EvaluationError::failed(format!(
                "{} exited with {}: {}",
                self.spec.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }
}

#[async_trait]
impl Evaluator for CommandEvaluator {
    async fn evaluate(&self, candidate: &[f64]) -> EvalResult<Report> {
        let mut args = self.spec.args.clone();
        args.extend(candidate.iter().map(|v| v.to_string()));
        debug!("Running {} {:?}", self.spec.program, args);

        let output = self.execute(&args).await?;
        parse_report(&String::from_utf8_lossy(&output.stdout))
    }

    async fn probe(&self, dimension: usize) -> EvalResult<()> {
        let Some(probe_args) = &self.spec.probe_args else {
            return Ok(());
        };
        let mut args = probe_args.clone();
        args.push(dimension.to_string());
        self.execute(&args).await.map(|_| ())
    }
}

/// Parse the evaluator's last non-empty output line.
pub fn parse_report(stdout: &str) -> EvalResult<Report> {
    let line = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .ok_or_else(|| EvaluationError::failed("evaluator printed nothing"))?;

    if let Ok(fitness) = line.parse::<f64>() {
        return Ok(Report::new(fitness));
    }

    let mut value: serde_json::Value = serde_json::from_str(line)
        .map_err(|_| EvaluationError::failed(format!("unrecognized evaluator output: {line}")))?;
    let fitness = value
        .get("fitness")
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| EvaluationError::failed(format!("no numeric fitness in: {line}")))?;
    if let Some(object) = value.as_object_mut() {
        object.remove("fitness");
    }

    Ok(Report::new(fitness).with_metrics(value))
}
