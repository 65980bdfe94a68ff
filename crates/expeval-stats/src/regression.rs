//! Weighted least squares regression.
//!
//! This module fits linear models of the form `y = Xβ + ε` by minimizing
//! `Σ wᵢ (yᵢ - xᵢβ)²`. Inference follows the classical (non-robust) OLS
//! recipe applied to the weighted problem:
//!
//! - `β = (X'WX)⁻¹ X'Wy`
//! - `σ² = Σ wᵢ rᵢ² / (n - k)` where `n` counts rows with positive weight
//! - `Cov(β) = σ² (X'WX)⁻¹`
//! - each coefficient is tested against zero with a Student-t distribution on
//!   `n - k` degrees of freedom
//!
//! The normal equations are solved with a Cholesky factorization. A pivot that
//! collapses relative to its original diagonal entry marks the design as rank
//! deficient.
//!
//! # Examples
//!
//! ```
//! use expeval_stats::regression::{DesignMatrix, WeightedLeastSquares};
//!
//! let treated = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
//! let y = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let weights = [1.0; 6];
//!
//! let design = DesignMatrix::from_columns([("is_treated", treated)])
//!     .unwrap()
//!     .with_intercept();
//! let fit = WeightedLeastSquares::fit(&design, &y, &weights).unwrap();
//!
//! let effect = fit.coefficient("is_treated").unwrap();
//! assert!((effect.estimate - 3.0).abs() < 1e-12);
//! assert!(effect.p_value < 0.05);
//! ```

use crate::distribution::student_t_two_sided_p_value;

/// Name given to the intercept column by [`DesignMatrix::with_intercept`].
pub const INTERCEPT: &str = "const";

const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum RegressionError {
    #[display("{what} has {found} rows, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[display("weight {weight} at row {row} is not a non-negative finite number")]
    InvalidWeight { row: usize, weight: f64 },
    #[display("non-finite value at row {row}")]
    NonFiniteValue { row: usize },
    #[display("{observations} weighted observations cannot identify {parameters} parameters")]
    TooFewObservations {
        observations: usize,
        parameters: usize,
    },
    #[display("design matrix is rank deficient at column '{column}'")]
    RankDeficient { column: String },
}

/// Regressor matrix with named columns, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    names: Vec<String>,
    num_rows: usize,
    data: Vec<f64>,
}

impl DesignMatrix {
    /// Builds a design matrix from named columns of equal length.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, RegressionError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let (names, columns): (Vec<String>, Vec<Vec<f64>>) = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .unzip();
        let num_rows = columns.first().map_or(0, Vec::len);
        for column in &columns {
            if column.len() != num_rows {
                return Err(RegressionError::DimensionMismatch {
                    what: "design column",
                    expected: num_rows,
                    found: column.len(),
                });
            }
        }

        let mut data = Vec::with_capacity(num_rows * names.len());
        for row in 0..num_rows {
            data.extend(columns.iter().map(|column| column[row]));
        }
        Ok(Self {
            names,
            num_rows,
            data,
        })
    }

    /// Prepends a column of ones named [`INTERCEPT`].
    #[must_use]
    pub fn with_intercept(self) -> Self {
        let num_cols = self.num_cols();
        let mut data = Vec::with_capacity(self.num_rows * (num_cols + 1));
        for row in 0..self.num_rows {
            data.push(1.0);
            data.extend_from_slice(self.row(row));
        }
        let mut names = Vec::with_capacity(num_cols + 1);
        names.push(INTERCEPT.to_owned());
        names.extend(self.names);
        Self {
            names,
            num_rows: self.num_rows,
            data,
        }
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[must_use]
    pub fn num_cols(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        let k = self.num_cols();
        &self.data[index * k..(index + 1) * k]
    }
}

/// Estimate and inference for one regression coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    /// Two-sided p-value for the null hypothesis that the coefficient is 0.
    pub p_value: f64,
}

/// A fitted weighted least squares model.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionFit {
    /// Coefficients in design-matrix column order.
    pub coefficients: Vec<Coefficient>,
    /// Residual degrees of freedom (`n - k`).
    pub df_resid: f64,
    /// Estimated residual variance `σ²`.
    pub scale: f64,
    /// Number of rows with positive weight.
    pub nobs: usize,
}

impl RegressionFit {
    #[must_use]
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WeightedLeastSquares;

impl WeightedLeastSquares {
    /// Fits `y` on `design` with row weights `weights`.
    ///
    /// Rows with zero weight contribute nothing to the fit and are not counted
    /// as observations, so they do not add to the residual degrees of freedom
    /// either. This follows R's `lm`; statsmodels `WLS` instead keeps them in
    /// `nobs` and `df_resid`.
    #[expect(clippy::cast_precision_loss)]
    pub fn fit(
        design: &DesignMatrix,
        y: &[f64],
        weights: &[f64],
    ) -> Result<RegressionFit, RegressionError> {
        let n = design.num_rows();
        let k = design.num_cols();
        if y.len() != n {
            return Err(RegressionError::DimensionMismatch {
                what: "response",
                expected: n,
                found: y.len(),
            });
        }
        if weights.len() != n {
            return Err(RegressionError::DimensionMismatch {
                what: "weights",
                expected: n,
                found: weights.len(),
            });
        }

        let mut xtwx = vec![0.0_f64; k * k];
        let mut xtwy = vec![0.0_f64; k];
        let mut nobs = 0;
        for (row, (&yi, &wi)) in y.iter().zip(weights).enumerate() {
            if !wi.is_finite() || wi < 0.0 {
                return Err(RegressionError::InvalidWeight { row, weight: wi });
            }
            if wi == 0.0 {
                continue;
            }
            let xi = design.row(row);
            if !yi.is_finite() || xi.iter().any(|v| !v.is_finite()) {
                return Err(RegressionError::NonFiniteValue { row });
            }
            nobs += 1;
            for a in 0..k {
                xtwy[a] += wi * xi[a] * yi;
                for b in 0..=a {
                    xtwx[a * k + b] += wi * xi[a] * xi[b];
                }
            }
        }
        if nobs <= k {
            return Err(RegressionError::TooFewObservations {
                observations: nobs,
                parameters: k,
            });
        }
        for a in 0..k {
            for b in 0..a {
                xtwx[b * k + a] = xtwx[a * k + b];
            }
        }

        let factor = cholesky(&xtwx, k).map_err(|column| RegressionError::RankDeficient {
            column: design.names()[column].clone(),
        })?;
        let inverse = cholesky_inverse(&factor, k);
        let params = (0..k)
            .map(|a| (0..k).map(|b| inverse[a * k + b] * xtwy[b]).sum::<f64>())
            .collect::<Vec<_>>();

        let ssr = y
            .iter()
            .zip(weights)
            .enumerate()
            .filter(|(_, (_, w))| **w > 0.0)
            .map(|(row, (yi, wi))| {
                let fitted = design
                    .row(row)
                    .iter()
                    .zip(&params)
                    .map(|(x, b)| x * b)
                    .sum::<f64>();
                wi * (yi - fitted).powi(2)
            })
            .sum::<f64>();
        let df_resid = (nobs - k) as f64;
        let scale = ssr / df_resid;

        let coefficients = design
            .names()
            .iter()
            .zip(&params)
            .enumerate()
            .map(|(a, (name, &estimate))| {
                let std_error = std_error_from_variance(scale * inverse[a * k + a]);
                let t_value = estimate / std_error;
                let p_value = student_t_two_sided_p_value(t_value, df_resid)
                    .expect("residual degrees of freedom are positive");
                Coefficient {
                    name: name.clone(),
                    estimate,
                    std_error,
                    t_value,
                    p_value,
                }
            })
            .collect();

        Ok(RegressionFit {
            coefficients,
            df_resid,
            scale,
            nobs,
        })
    }
}

/// Square root of a coefficient variance.
///
/// Round-off can push a variance that should be zero slightly below it; that
/// is clamped to zero. `NaN` is passed through.
fn std_error_from_variance(variance: f64) -> f64 {
    if variance < 0.0 { 0.0 } else { variance.sqrt() }
}

/// Lower-triangular Cholesky factor of a symmetric `k×k` matrix.
///
/// On failure returns the index of the column whose pivot vanished.
fn cholesky(matrix: &[f64], k: usize) -> Result<Vec<f64>, usize> {
    let mut lower = vec![0.0_f64; k * k];
    for j in 0..k {
        let diagonal = matrix[j * k + j];
        let pivot = diagonal - (0..j).map(|p| lower[j * k + p].powi(2)).sum::<f64>();
        if pivot.is_nan() || pivot <= RANK_TOLERANCE * diagonal.abs() {
            return Err(j);
        }
        let l_jj = pivot.sqrt();
        lower[j * k + j] = l_jj;
        for i in (j + 1)..k {
            let dot = (0..j)
                .map(|p| lower[i * k + p] * lower[j * k + p])
                .sum::<f64>();
            lower[i * k + j] = (matrix[i * k + j] - dot) / l_jj;
        }
    }
    Ok(lower)
}

/// Inverse of `L Lᵀ` given its Cholesky factor `L`.
fn cholesky_inverse(lower: &[f64], k: usize) -> Vec<f64> {
    let mut inverse = vec![0.0_f64; k * k];
    let mut column = vec![0.0_f64; k];
    for e in 0..k {
        // Forward substitution: L z = e
        for i in 0..k {
            let rhs = if i == e { 1.0 } else { 0.0 };
            let dot = (0..i).map(|p| lower[i * k + p] * column[p]).sum::<f64>();
            column[i] = (rhs - dot) / lower[i * k + i];
        }
        // Back substitution: Lᵀ x = z
        for i in (0..k).rev() {
            let dot = ((i + 1)..k)
                .map(|p| lower[p * k + i] * column[p])
                .sum::<f64>();
            column[i] = (column[i] - dot) / lower[i * k + i];
        }
        for i in 0..k {
            inverse[i * k + e] = column[i];
        }
    }
    inverse
}
