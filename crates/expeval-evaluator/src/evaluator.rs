use expeval_stats::{
    regression::{DesignMatrix, RegressionError, WeightedLeastSquares},
    welch::WelchTest,
};
use expeval_table::{ExperimentColumns, ObservationTable};
use serde::Serialize;

use crate::{
    cuped::CupedAdjustment,
    error::{EvaluationError, InputProblem},
    inputs,
};

/// Name of the treatment regressor in the fitted model.
const TREATMENT_TERM: &str = "is_treated";

/// Estimation strategy for [`ExperimentEvaluator::evaluate`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, derive_more::FromStr, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Welch's t-test on the assignment labels.
    #[display("welch")]
    Welch,
    /// Weighted least squares on the treatment indicator.
    #[display("wls")]
    Wls,
    /// Weighted least squares on the CUPED-adjusted outcome.
    #[display("cuped")]
    Cuped,
}

impl Method {
    pub const ALL: [Self; 3] = [Self::Welch, Self::Wls, Self::Cuped];
}

/// Estimated effect of treatment on a metric (treatment minus control).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentEffect {
    pub estimate: f64,
    pub std_error: f64,
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    /// Two-sided p-value of the null hypothesis of no effect.
    pub p_value: f64,
    /// Number of rows that entered the computation.
    pub observations: usize,
}

impl TreatmentEffect {
    fn from_welch(test: &WelchTest) -> Self {
        // Welch compares control minus treatment; flip to treatment minus control.
        Self {
            estimate: -test.mean_difference,
            std_error: test.std_error,
            t_statistic: -test.t_statistic,
            degrees_of_freedom: test.degrees_of_freedom,
            p_value: test.p_value,
            observations: test.sample1.count + test.sample2.count,
        }
    }
}

/// Result of [`ExperimentEvaluator::fit_cuped`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CupedFit {
    pub adjustment: CupedAdjustment,
    pub effect: TreatmentEffect,
}

/// Result of [`ExperimentEvaluator::evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub metric: String,
    pub method: Method,
    pub p_value: f64,
    pub effect: TreatmentEffect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<CupedAdjustment>,
}

/// Tests whether a treatment moved a metric.
///
/// Every operation is a pure function of the table it is given. Column names
/// come from [`ExperimentColumns`] and are validated before any statistic is
/// computed; rows with a missing outcome (or covariate, for CUPED) are
/// excluded silently.
///
/// # Examples
///
/// ```
/// use expeval_evaluator::ExperimentEvaluator;
/// use expeval_table::ObservationTable;
///
/// let table = ObservationTable::new()
///     .with_column("assignments", vec!["control", "control", "control", "treatment", "treatment", "treatment"])?
///     .with_column("is_treated", vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0])?
///     .with_column("assignments_freq", vec![1.0; 6])?
///     .with_column("revenue", vec![10.1, 9.8, 10.3, 12.2, 11.9, 12.4])?;
///
/// let evaluator = ExperimentEvaluator::default();
/// assert!(evaluator.welch_t_test(&table, "revenue")? < 0.01);
/// assert!(evaluator.weighted_least_squares(&table, "revenue")? < 0.01);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentEvaluator {
    pub columns: ExperimentColumns,
}

impl ExperimentEvaluator {
    #[must_use]
    pub fn new(columns: ExperimentColumns) -> Self {
        Self { columns }
    }

    /// Two-sided p-value of Welch's t-test between the control and treatment
    /// groups of the assignment column.
    pub fn welch_t_test(
        &self,
        table: &ObservationTable,
        metric: &str,
    ) -> Result<f64, EvaluationError> {
        Ok(self.welch_t_test_detail(table, metric)?.p_value)
    }

    /// Welch's t-test with every intermediate statistic.
    ///
    /// `sample1` is the control group and `sample2` the treatment group.
    pub fn welch_t_test_detail(
        &self,
        table: &ObservationTable,
        metric: &str,
    ) -> Result<WelchTest, EvaluationError> {
        let groups = inputs::assignment_groups(table, &self.columns)?;
        let values = finite_numeric(table, metric)?;

        let mut control = vec![];
        let mut treatment = vec![];
        for (is_treatment, value) in groups.into_iter().zip(values) {
            let Some(value) = value else { continue };
            if is_treatment {
                treatment.push(value);
            } else {
                control.push(value);
            }
        }
        tracing::debug!(
            metric,
            control = control.len(),
            treatment = treatment.len(),
            "welch t-test samples"
        );

        for (label, sample) in [
            (&self.columns.control_label, &control),
            (&self.columns.treatment_label, &treatment),
        ] {
            if sample.len() < 2 {
                return Err(EvaluationError::insufficient(format!(
                    "group '{label}' has {} observations of '{metric}', at least 2 required",
                    sample.len()
                )));
            }
        }
        WelchTest::new(&control, &treatment)
            .ok_or_else(|| EvaluationError::insufficient("welch t-test needs 2 values per group"))
    }

    /// Two-sided p-value of the treatment coefficient in the weighted
    /// regression of `metric` on an intercept and the treatment indicator.
    pub fn weighted_least_squares(
        &self,
        table: &ObservationTable,
        metric: &str,
    ) -> Result<f64, EvaluationError> {
        Ok(self.fit_weighted_least_squares(table, metric)?.p_value)
    }

    /// Weighted regression of `metric` on the treatment indicator.
    pub fn fit_weighted_least_squares(
        &self,
        table: &ObservationTable,
        metric: &str,
    ) -> Result<TreatmentEffect, EvaluationError> {
        let outcome = finite_numeric(table, metric)?;
        self.fit_outcome(table, metric, &outcome)
    }

    /// Two-sided p-value of the treatment coefficient after CUPED adjustment
    /// of `metric` by its pre-experiment counterpart.
    pub fn cuped_adjusted_wls(
        &self,
        table: &ObservationTable,
        metric: &str,
    ) -> Result<f64, EvaluationError> {
        Ok(self.fit_cuped(table, metric)?.effect.p_value)
    }

    /// CUPED-adjusted weighted regression, returning the estimated adjustment
    /// alongside the treatment effect.
    ///
    /// The covariate column is `metric` followed by the configured pre-period
    /// suffix.
    pub fn fit_cuped(
        &self,
        table: &ObservationTable,
        metric: &str,
    ) -> Result<CupedFit, EvaluationError> {
        let covariate_name = self.columns.pre_metric(metric);
        let outcome = finite_numeric(table, metric)?;
        let covariate = finite_numeric(table, &covariate_name)?;

        let adjustment = CupedAdjustment::estimate(&outcome, &covariate, &covariate_name)?;
        tracing::debug!(
            metric,
            theta = adjustment.theta,
            covariate_mean = adjustment.covariate_mean,
            valid_rows = adjustment.valid_rows,
            "estimated cuped adjustment"
        );
        let adjusted = adjustment.apply(&outcome, &covariate);
        let effect = self.fit_outcome(table, metric, &adjusted)?;
        Ok(CupedFit { adjustment, effect })
    }

    /// Runs one method and collects its result.
    pub fn evaluate(
        &self,
        table: &ObservationTable,
        metric: &str,
        method: Method,
    ) -> Result<Evaluation, EvaluationError> {
        let (effect, adjustment) = match method {
            Method::Welch => (
                TreatmentEffect::from_welch(&self.welch_t_test_detail(table, metric)?),
                None,
            ),
            Method::Wls => (self.fit_weighted_least_squares(table, metric)?, None),
            Method::Cuped => {
                let fit = self.fit_cuped(table, metric)?;
                (fit.effect, Some(fit.adjustment))
            }
        };
        Ok(Evaluation {
            metric: metric.to_owned(),
            method,
            p_value: effect.p_value,
            effect,
            adjustment,
        })
    }

    /// Fits the regression on the rows where `outcome` is present.
    fn fit_outcome(
        &self,
        table: &ObservationTable,
        metric: &str,
        outcome: &[Option<f64>],
    ) -> Result<TreatmentEffect, EvaluationError> {
        let treated = inputs::treatment_indicator(table, &self.columns.is_treated)?;
        let weights = inputs::weights(table, &self.columns.weight)?;

        let mut x = vec![];
        let mut y = vec![];
        let mut w = vec![];
        for ((value, is_treated), weight) in outcome.iter().zip(treated).zip(weights) {
            let Some(value) = value else { continue };
            x.push(if is_treated { 1.0 } else { 0.0 });
            y.push(*value);
            w.push(weight);
        }
        let excluded = outcome.len() - y.len();
        if excluded > 0 {
            tracing::debug!(metric, excluded, "excluded rows with missing outcome");
        }

        let design = DesignMatrix::from_columns([(TREATMENT_TERM, x)])
            .map_err(|e| self.regression_error(metric, e))?
            .with_intercept();
        let fit = WeightedLeastSquares::fit(&design, &y, &w)
            .map_err(|e| self.regression_error(metric, e))?;
        let coefficient = fit.coefficient(TREATMENT_TERM).ok_or_else(|| {
            EvaluationError::insufficient("treatment coefficient missing from fit")
        })?;

        Ok(TreatmentEffect {
            estimate: coefficient.estimate,
            std_error: coefficient.std_error,
            t_statistic: coefficient.t_value,
            degrees_of_freedom: fit.df_resid,
            p_value: coefficient.p_value,
            observations: fit.nobs,
        })
    }

    fn regression_error(&self, metric: &str, error: RegressionError) -> EvaluationError {
        match error {
            RegressionError::RankDeficient { .. } | RegressionError::TooFewObservations { .. } => {
                EvaluationError::insufficient(format!("regression of '{metric}': {error}"))
            }
            RegressionError::InvalidWeight { row, weight } => EvaluationError::invalid(
                &self.columns.weight,
                InputProblem::InvalidWeight { row, weight },
            ),
            RegressionError::NonFiniteValue { row } => {
                EvaluationError::invalid(metric, InputProblem::NonFinite { row })
            }
            RegressionError::DimensionMismatch { .. } => EvaluationError::invalid(
                metric,
                InputProblem::WrongKind {
                    expected: "column of table length",
                    found: expeval_table::ColumnKind::Numeric,
                },
            ),
        }
    }
}

/// Numeric column whose present values are all finite.
fn finite_numeric(
    table: &ObservationTable,
    name: &str,
) -> Result<Vec<Option<f64>>, EvaluationError> {
    let values = inputs::numeric(table, name)?;
    if let Some(row) = values.iter().position(|v| v.is_some_and(|v| !v.is_finite())) {
        return Err(EvaluationError::invalid(name, InputProblem::NonFinite { row }));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use expeval_simulation::CupedDgp;
    use expeval_table::Column;
    use rand::{Rng as _, SeedableRng as _};
    use rand_distr::{Distribution as _, Normal};
    use rand_pcg::Pcg64;

    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    /// Balanced table with alternating assignment and unit weights.
    fn balanced(n: usize, effect: f64, seed: u64) -> ObservationTable {
        let mut rng = Pcg64::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let treated = (0..n).map(|i| i % 2 == 1).collect::<Vec<_>>();
        let metric = treated
            .iter()
            .map(|&t| 5.0 + if t { effect } else { 0.0 } + noise.sample(&mut rng))
            .collect::<Vec<f64>>();
        let labels = treated
            .iter()
            .map(|&t| if t { "treatment" } else { "control" })
            .collect::<Vec<_>>();
        ObservationTable::new()
            .with_column("assignments", labels)
            .unwrap()
            .with_column("is_treated", treated)
            .unwrap()
            .with_column("assignments_freq", vec![1.0; n])
            .unwrap()
            .with_column("metric", metric)
            .unwrap()
    }

    fn swap_labels(table: &ObservationTable) -> ObservationTable {
        let mut swapped = table.clone();
        let labels = swapped.remove_column("assignments").unwrap();
        let flipped = labels
            .as_categorical()
            .unwrap()
            .iter()
            .map(|label| match label.as_deref() {
                Some("control") => "treatment",
                _ => "control",
            })
            .collect::<Vec<_>>();
        swapped.push_column("assignments", flipped).unwrap();
        swapped
    }

    #[test]
    fn test_welch_is_symmetric_in_labels() {
        let evaluator = ExperimentEvaluator::default();
        let table = balanced(41, 0.3, 7);
        let p = evaluator.welch_t_test(&table, "metric").unwrap();
        let swapped = evaluator
            .welch_t_test(&swap_labels(&table), "metric")
            .unwrap();
        assert!(close(p, swapped, 1e-12));
    }

    #[test]
    fn test_wls_matches_welch_for_balanced_unit_weights() {
        let evaluator = ExperimentEvaluator::default();
        let table = balanced(400, 0.2, 11);
        let welch = evaluator.welch_t_test(&table, "metric").unwrap();
        let wls = evaluator.weighted_least_squares(&table, "metric").unwrap();
        assert!(close(welch, wls, 1e-3), "welch={welch} wls={wls}");

        let detail = evaluator.welch_t_test_detail(&table, "metric").unwrap();
        let effect = evaluator
            .fit_weighted_least_squares(&table, "metric")
            .unwrap();
        assert!(close(-detail.t_statistic, effect.t_statistic, 1e-9));
        assert_eq!(effect.observations, 400);
    }

    #[test]
    fn test_cuped_without_correlation_matches_wls() {
        let n = 10_000;
        let mut table = balanced(n, 0.05, 3);
        let mut rng = Pcg64::seed_from_u64(99);
        let pre = (0..n)
            .map(|_| rng.random_range(0.0..10.0))
            .collect::<Vec<f64>>();
        table.push_column("metric_pre", pre).unwrap();

        let evaluator = ExperimentEvaluator::default();
        let wls = evaluator.weighted_least_squares(&table, "metric").unwrap();
        let fit = evaluator.fit_cuped(&table, "metric").unwrap();
        assert!(fit.adjustment.theta.abs() < 0.05);
        assert!(
            close(wls, fit.effect.p_value, 0.05),
            "wls={wls} cuped={}",
            fit.effect.p_value
        );
    }

    #[test]
    fn test_cuped_reduces_standard_error() {
        let table = CupedDgp::default()
            .make_data(1000, 0.5, 2312, &ExperimentColumns::default())
            .unwrap();
        let evaluator = ExperimentEvaluator::default();
        let wls = evaluator.fit_weighted_least_squares(&table, "y").unwrap();
        let cuped = evaluator.fit_cuped(&table, "y").unwrap();
        assert!(cuped.effect.std_error < wls.std_error);
        assert!(close(cuped.adjustment.theta, 1.0, 0.2));
    }

    #[test]
    fn test_constant_covariate_is_degenerate() {
        let mut table = balanced(20, 1.0, 5);
        table.push_column("metric_pre", vec![3.0; 20]).unwrap();
        let evaluator = ExperimentEvaluator::default();
        assert_eq!(
            evaluator.cuped_adjusted_wls(&table, "metric"),
            Err(EvaluationError::DegenerateCovariate {
                column: "metric_pre".to_owned()
            })
        );
    }

    #[test]
    fn test_cuped_theta_uses_complete_rows_only() {
        let metric = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let pre = [0.9, 2.2, 2.8, 4.1, 5.0, 6.3, 6.9, 1e6, -1e6, 1e6];
        let complete = 7;

        let table = ObservationTable::new()
            .with_column("is_treated", (0..10).map(|i| i % 2 == 0).collect::<Vec<_>>())
            .unwrap()
            .with_column("assignments_freq", vec![1.0; 10])
            .unwrap()
            .with_column(
                "metric",
                metric
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| (i < complete).then_some(v))
                    .collect::<Vec<_>>(),
            )
            .unwrap()
            .with_column("metric_pre", pre.to_vec())
            .unwrap();

        let expected = CupedAdjustment::estimate(
            &metric[..complete].iter().copied().map(Some).collect::<Vec<_>>(),
            &pre[..complete].iter().copied().map(Some).collect::<Vec<_>>(),
            "metric_pre",
        )
        .unwrap();

        let fit = ExperimentEvaluator::default()
            .fit_cuped(&table, "metric")
            .unwrap();
        assert_eq!(fit.adjustment.valid_rows, complete);
        assert!(close(fit.adjustment.theta, expected.theta, 1e-12));
        assert_eq!(fit.effect.observations, complete);
    }

    #[test]
    fn test_cuped_drops_rows_with_missing_covariate() {
        let mut table = balanced(12, 0.5, 21);
        let pre = (0..12)
            .map(|i| (i != 4).then(|| f64::from(i) * 0.5))
            .collect::<Vec<_>>();
        table.push_column("metric_pre", Column::Numeric(pre)).unwrap();
        let fit = ExperimentEvaluator::default()
            .fit_cuped(&table, "metric")
            .unwrap();
        assert_eq!(fit.adjustment.valid_rows, 11);
        assert_eq!(fit.effect.observations, 11);
    }

    #[test]
    fn test_concrete_scenario_rejects_null() {
        let table = CupedDgp::default()
            .make_data(1000, 0.5, 2312, &ExperimentColumns::default())
            .unwrap();
        let evaluator = ExperimentEvaluator::default();
        // Seed 2312 gives p ≈ 1.4e-11 for WLS and Welch, ≈ 8e-50 for CUPED
        let wls = evaluator.weighted_least_squares(&table, "y").unwrap();
        assert!(wls < 1e-6, "p = {wls}");
        let cuped = evaluator.cuped_adjusted_wls(&table, "y").unwrap();
        assert!(cuped < wls);
        let welch = evaluator.welch_t_test(&table, "y").unwrap();
        assert!(welch < 1e-6, "p = {welch}");
    }

    #[test]
    fn test_single_group_is_insufficient() {
        let n = 10;
        let table = ObservationTable::new()
            .with_column("assignments", vec!["control"; n])
            .unwrap()
            .with_column("is_treated", vec![false; n])
            .unwrap()
            .with_column("assignments_freq", vec![1.0; n])
            .unwrap()
            .with_column("metric", (0..n).map(|i| i as f64).collect::<Vec<_>>())
            .unwrap();
        let evaluator = ExperimentEvaluator::default();
        assert!(
            evaluator
                .welch_t_test(&table, "metric")
                .unwrap_err()
                .is_insufficient_data()
        );
        assert!(
            evaluator
                .weighted_least_squares(&table, "metric")
                .unwrap_err()
                .is_insufficient_data()
        );
    }

    #[test]
    fn test_all_zero_weights_is_insufficient() {
        let mut table = balanced(10, 1.0, 1);
        table.remove_column("assignments_freq");
        table.push_column("assignments_freq", vec![0.0; 10]).unwrap();
        assert!(
            ExperimentEvaluator::default()
                .weighted_least_squares(&table, "metric")
                .unwrap_err()
                .is_insufficient_data()
        );
    }

    #[test]
    fn test_missing_columns_are_invalid_input() {
        let table = balanced(10, 1.0, 1);
        let evaluator = ExperimentEvaluator::default();
        assert!(
            evaluator
                .welch_t_test(&table, "revenue")
                .unwrap_err()
                .is_invalid_input()
        );
        assert!(matches!(
            evaluator.cuped_adjusted_wls(&table, "metric"),
            Err(EvaluationError::InvalidInput { column, problem: InputProblem::MissingColumn })
                if column == "metric_pre"
        ));

        let renamed = ExperimentEvaluator::new(ExperimentColumns {
            is_treated: "treated".to_owned(),
            ..ExperimentColumns::default()
        });
        assert!(
            renamed
                .weighted_least_squares(&table, "metric")
                .unwrap_err()
                .is_invalid_input()
        );
    }

    #[test]
    fn test_weights_scale_observations() {
        let table = balanced(40, 0.5, 8);
        let evaluator = ExperimentEvaluator::default();
        let base = evaluator
            .fit_weighted_least_squares(&table, "metric")
            .unwrap();

        // Uniformly rescaled weights leave the estimate and its inference unchanged.
        let mut scaled = table.clone();
        scaled.remove_column("assignments_freq");
        scaled.push_column("assignments_freq", vec![3.0; 40]).unwrap();
        let effect = evaluator
            .fit_weighted_least_squares(&scaled, "metric")
            .unwrap();
        assert!(close(base.estimate, effect.estimate, 1e-9));
        assert!(close(base.p_value, effect.p_value, 1e-9));
    }

    #[test]
    fn test_evaluate_dispatch() {
        let table = CupedDgp::default()
            .make_data(200, 0.5, 1, &ExperimentColumns::default())
            .unwrap();
        let evaluator = ExperimentEvaluator::default();
        for method in Method::ALL {
            let evaluation = evaluator.evaluate(&table, "y", method).unwrap();
            assert_eq!(evaluation.method, method);
            assert_eq!(evaluation.p_value, evaluation.effect.p_value);
            assert_eq!(evaluation.adjustment.is_some(), method == Method::Cuped);
            assert!(evaluation.effect.estimate > 0.0);
        }
        assert_eq!("wls".parse::<Method>().unwrap(), Method::Wls);
        assert_eq!(Method::Cuped.to_string(), "cuped");
        assert_eq!(
            serde_json::to_value(Method::Welch).unwrap(),
            serde_json::json!("welch")
        );
    }
}
