//! Hypothesis tests for A/B experiments.
//!
//! [`ExperimentEvaluator`] answers one question per call: did the treatment
//! change a metric? Three interchangeable strategies produce the two-sided
//! p-value of "no effect":
//!
//! - [`welch_t_test`](ExperimentEvaluator::welch_t_test): Welch's
//!   unequal-variance t-test between the control and treatment labels
//! - [`weighted_least_squares`](ExperimentEvaluator::weighted_least_squares):
//!   regression of the metric on an intercept and the treatment indicator,
//!   weighted by the assignment frequency
//! - [`cuped_adjusted_wls`](ExperimentEvaluator::cuped_adjusted_wls): the same
//!   regression after removing the part of the metric explained by its
//!   pre-experiment value (see [`cuped`])
//!
//! Column names are taken from [`ExperimentColumns`](expeval_table::ExperimentColumns).
//! Failures are reported as [`EvaluationError`]; rows with missing values are
//! filtered, not rejected.

pub use self::{
    cuped::CupedAdjustment,
    error::{EvaluationError, InputProblem},
    evaluator::{CupedFit, Evaluation, ExperimentEvaluator, Method, TreatmentEffect},
};

pub mod cuped;
mod error;
mod evaluator;
mod inputs;
