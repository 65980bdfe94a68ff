use crate::descriptive::mean;

/// 2×2 sample covariance matrix of two paired series.
///
/// Entries follow the usual `cov(a, b)` layout: `[0][0]` is `Var(a)`,
/// `[1][1]` is `Var(b)` and the off-diagonal entries are `Cov(a, b)`.
/// All entries use the unbiased (`n - 1`) normalization.
///
/// # Examples
///
/// ```
/// use expeval_stats::covariance::CovarianceMatrix;
///
/// let a = [1.0, 2.0, 3.0, 4.0];
/// let b = [2.0, 4.0, 6.0, 8.0];
/// let m = CovarianceMatrix::new(&a, &b).unwrap();
/// assert!((m.covariance() - 10.0 / 3.0).abs() < 1e-12);
/// assert!((m.slope() - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CovarianceMatrix {
    pub entries: [[f64; 2]; 2],
}

impl CovarianceMatrix {
    /// Computes the covariance matrix of `a` and `b`.
    ///
    /// Returns `None` if the series differ in length or contain fewer than
    /// two pairs.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(a: &[f64], b: &[f64]) -> Option<Self> {
        if a.len() != b.len() || a.len() < 2 {
            return None;
        }
        let mean_a = mean(a)?;
        let mean_b = mean(b)?;
        let dof = (a.len() - 1) as f64;

        let mut sum_aa = 0.0;
        let mut sum_ab = 0.0;
        let mut sum_bb = 0.0;
        for (x, y) in a.iter().zip(b) {
            let da = x - mean_a;
            let db = y - mean_b;
            sum_aa += da * da;
            sum_ab += da * db;
            sum_bb += db * db;
        }

        let cov = sum_ab / dof;
        Some(Self {
            entries: [[sum_aa / dof, cov], [cov, sum_bb / dof]],
        })
    }

    #[must_use]
    pub fn variance_a(&self) -> f64 {
        self.entries[0][0]
    }

    #[must_use]
    pub fn variance_b(&self) -> f64 {
        self.entries[1][1]
    }

    #[must_use]
    pub fn covariance(&self) -> f64 {
        self.entries[0][1]
    }

    /// Returns `Cov(a, b) / Var(b)`, the least-squares slope of `a` on `b`.
    ///
    /// The result is not finite when `Var(b)` is zero.
    #[must_use]
    pub fn slope(&self) -> f64 {
        self.covariance() / self.variance_b()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch() {
        assert!(CovarianceMatrix::new(&[1.0, 2.0], &[1.0]).is_none());
    }

    #[test]
    fn test_too_few_pairs() {
        assert!(CovarianceMatrix::new(&[1.0], &[1.0]).is_none());
        assert!(CovarianceMatrix::new(&[], &[]).is_none());
    }

    #[test]
    fn test_symmetric_entries() {
        let a = [1.0, 3.0, 2.0, 5.0, 4.0];
        let b = [2.0, 1.0, 4.0, 3.0, 6.0];
        let m = CovarianceMatrix::new(&a, &b).unwrap();
        assert_eq!(m.entries[0][1], m.entries[1][0]);
        assert!((m.variance_a() - 2.5).abs() < 1e-12);
        assert!((m.variance_b() - 3.7).abs() < 1e-12);
        assert!((m.covariance() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_series_has_zero_variance() {
        let m = CovarianceMatrix::new(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]).unwrap();
        assert_eq!(m.variance_b(), 0.0);
        assert!(!m.slope().is_finite());
    }
}
