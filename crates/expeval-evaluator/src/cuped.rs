//! CUPED (Controlled-experiment Using Pre-Experiment Data) adjustment.
//!
//! The outcome `y` is replaced by `y - θ (x - mean(x))`, where `x` is the same
//! metric measured before the experiment and `θ = Cov(y, x) / Var(x)`.
//! Subtracting the part of `y` predicted by `x` shrinks the residual variance
//! of the treatment-effect estimate without biasing it, as long as `x` is not
//! affected by treatment.
//!
//! # Missing values
//!
//! - `θ` is estimated on the rows where both `y` and `x` are present.
//! - `mean(x)` is taken over every row where `x` is present.
//! - The adjustment is applied to every row; a row missing either value has a
//!   missing adjusted outcome and is dropped by the regression that follows.

use expeval_stats::{covariance::CovarianceMatrix, descriptive::mean};
use serde::Serialize;

use crate::error::EvaluationError;

/// Estimated CUPED adjustment for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CupedAdjustment {
    /// `Cov(y, x) / Var(x)` on the rows where both values are present.
    pub theta: f64,
    /// Mean of the covariate over every row where it is present.
    pub covariate_mean: f64,
    /// Number of rows used to estimate `theta`.
    pub valid_rows: usize,
}

impl CupedAdjustment {
    /// Estimates the adjustment from an outcome and its covariate.
    ///
    /// `covariate_name` only labels the error when the covariate is constant.
    pub fn estimate(
        outcome: &[Option<f64>],
        covariate: &[Option<f64>],
        covariate_name: &str,
    ) -> Result<Self, EvaluationError> {
        let (y_valid, x_valid): (Vec<f64>, Vec<f64>) = outcome
            .iter()
            .zip(covariate)
            .filter_map(|(y, x)| Some(((*y)?, (*x)?)))
            .unzip();
        if y_valid.len() < 2 {
            return Err(EvaluationError::insufficient(format!(
                "{} rows with both outcome and covariate present, at least 2 required",
                y_valid.len()
            )));
        }

        let degenerate = || EvaluationError::DegenerateCovariate {
            column: covariate_name.to_owned(),
        };
        if x_valid.iter().all(|x| *x == x_valid[0]) {
            return Err(degenerate());
        }
        let matrix = CovarianceMatrix::new(&y_valid, &x_valid)
            .ok_or_else(|| EvaluationError::insufficient("covariance needs at least 2 rows"))?;
        let theta = matrix.slope();
        if !theta.is_finite() {
            return Err(degenerate());
        }

        let present = covariate.iter().filter_map(|x| *x).collect::<Vec<_>>();
        let covariate_mean = mean(&present).ok_or_else(degenerate)?;

        Ok(Self {
            theta,
            covariate_mean,
            valid_rows: y_valid.len(),
        })
    }

    /// Applies the adjustment row by row.
    ///
    /// Rows missing either input yield a missing adjusted value.
    #[must_use]
    pub fn apply(&self, outcome: &[Option<f64>], covariate: &[Option<f64>]) -> Vec<Option<f64>> {
        outcome
            .iter()
            .zip(covariate)
            .map(|(y, x)| Some((*y)? - ((*x)? - self.covariate_mean) * self.theta))
            .collect()
    }
}
