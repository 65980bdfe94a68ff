//! Welch's unequal-variance two-sample t-test.
//!
//! The statistic compares `mean1 - mean2` against the standard error
//! `sqrt(s1²/n1 + s2²/n2)`. Degrees of freedom come from the
//! Welch–Satterthwaite approximation:
//!
//! ```text
//! df = (s1²/n1 + s2²/n2)² / ((s1²/n1)² / (n1 - 1) + (s2²/n2)² / (n2 - 1))
//! ```

use crate::{descriptive::SampleStats, distribution::student_t_two_sided_p_value};

/// Result of Welch's two-sample t-test.
#[derive(Debug, Clone, PartialEq)]
pub struct WelchTest {
    /// Statistics of the first sample.
    pub sample1: SampleStats,
    /// Statistics of the second sample.
    pub sample2: SampleStats,
    /// `mean1 - mean2`.
    pub mean_difference: f64,
    /// Standard error of the mean difference.
    pub std_error: f64,
    /// The t statistic.
    pub t_statistic: f64,
    /// Welch–Satterthwaite degrees of freedom.
    pub degrees_of_freedom: f64,
    /// Two-sided p-value.
    pub p_value: f64,
}

impl WelchTest {
    /// Runs Welch's t-test on two independent samples.
    ///
    /// Returns `None` when either sample has fewer than two values.
    ///
    /// If both samples have zero variance the standard error vanishes; the
    /// p-value is then 1 when the means coincide and 0 otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use expeval_stats::welch::WelchTest;
    ///
    /// let control = [19.8, 20.4, 19.6, 20.2, 20.0, 19.9];
    /// let treatment = [21.9, 22.3, 21.7, 22.4, 22.0, 21.8];
    /// let test = WelchTest::new(&control, &treatment).unwrap();
    /// assert!(test.t_statistic < 0.0);
    /// assert!(test.p_value < 1e-6);
    ///
    /// assert!(WelchTest::new(&[1.0], &treatment).is_none());
    /// ```
    #[must_use]
    pub fn new(sample1: &[f64], sample2: &[f64]) -> Option<Self> {
        let stats1 = SampleStats::new(sample1.iter().copied())?;
        let stats2 = SampleStats::new(sample2.iter().copied())?;
        let se1 = stats1.squared_std_error()?;
        let se2 = stats2.squared_std_error()?;

        let mean_difference = stats1.mean - stats2.mean;
        let squared_std_error = se1 + se2;
        let std_error = squared_std_error.sqrt();

        #[expect(clippy::cast_precision_loss)]
        let (dof1, dof2) = ((stats1.count - 1) as f64, (stats2.count - 1) as f64);
        let (degrees_of_freedom, t_statistic, p_value) = if std_error > 0.0 {
            let df = squared_std_error.powi(2) / (se1.powi(2) / dof1 + se2.powi(2) / dof2);
            let t = mean_difference / std_error;
            (df, t, student_t_two_sided_p_value(t, df)?)
        } else {
            // Both samples are constant: the difference is exact.
            let df = dof1 + dof2;
            if mean_difference == 0.0 {
                (df, 0.0, 1.0)
            } else {
                (df, mean_difference.signum() * f64::INFINITY, 0.0)
            }
        };

        Some(Self {
            sample1: stats1,
            sample2: stats2,
            mean_difference,
            std_error,
            t_statistic,
            degrees_of_freedom,
            p_value,
        })
    }
}
