use std::path::PathBuf;

use expeval_evaluator::{
    CupedAdjustment, Evaluation, EvaluationError, ExperimentEvaluator, Method, TreatmentEffect,
};
use expeval_table::ObservationTable;
use serde::Serialize;

use crate::util::{self, Output};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub(crate) enum MethodSelection {
    All,
    Welch,
    Wls,
    Cuped,
}

impl MethodSelection {
    fn methods(self) -> &'static [Method] {
        match self {
            MethodSelection::All => &Method::ALL,
            MethodSelection::Welch => &[Method::Welch],
            MethodSelection::Wls => &[Method::Wls],
            MethodSelection::Cuped => &[Method::Cuped],
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EvaluateArg {
    /// Input table (JSON)
    #[arg(long)]
    input: PathBuf,
    /// Metric column to evaluate (repeatable)
    #[arg(long = "metric", required = true)]
    metrics: Vec<String>,
    /// Estimation method: all, welch, wls or cuped
    #[arg(long, default_value = "all")]
    method: MethodSelection,
    /// Column naming configuration (JSON)
    #[arg(long)]
    columns: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ReportEntry {
    metric: String,
    method: Method,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Outcome {
    Result {
        p_value: f64,
        effect: TreatmentEffect,
        #[serde(skip_serializing_if = "Option::is_none")]
        adjustment: Option<CupedAdjustment>,
    },
    Error {
        kind: &'static str,
        message: String,
    },
}

impl From<Result<Evaluation, EvaluationError>> for Outcome {
    fn from(result: Result<Evaluation, EvaluationError>) -> Self {
        match result {
            Ok(evaluation) => Outcome::Result {
                p_value: evaluation.p_value,
                effect: evaluation.effect,
                adjustment: evaluation.adjustment,
            },
            Err(error) => Outcome::Error {
                kind: error.kind(),
                message: error.to_string(),
            },
        }
    }
}

pub(crate) fn run(arg: &EvaluateArg) -> anyhow::Result<()> {
    let table = util::read_table_file(&arg.input)?;
    let columns = util::read_columns_file(arg.columns.as_deref())?;
    let evaluator = ExperimentEvaluator::new(columns);

    let report = evaluate_all(&evaluator, &table, &arg.metrics, arg.method.methods());
    let failures = report
        .iter()
        .filter(|entry| matches!(entry.outcome, Outcome::Error { .. }))
        .count();
    tracing::info!(evaluations = report.len(), failures, "evaluation finished");
    Output::save_json(&report, arg.output.clone())
}

/// Evaluates every metric with every method; failures are recorded, not raised.
fn evaluate_all(
    evaluator: &ExperimentEvaluator,
    table: &ObservationTable,
    metrics: &[String],
    methods: &[Method],
) -> Vec<ReportEntry> {
    metrics
        .iter()
        .flat_map(|metric| methods.iter().map(move |&method| (metric, method)))
        .map(|(metric, method)| {
            let result = evaluator.evaluate(table, metric, method);
            match &result {
                Ok(evaluation) => {
                    tracing::info!(
                        metric = %metric,
                        %method,
                        p_value = evaluation.p_value,
                        "evaluated"
                    );
                }
                Err(error) => {
                    tracing::warn!(metric = %metric, %method, %error, "evaluation failed");
                }
            }
            ReportEntry {
                metric: metric.clone(),
                method,
                outcome: result.into(),
            }
        })
        .collect()
}
