/// Sample statistics summarizing a dataset.
///
/// This structure contains the measures of central tendency and dispersion
/// needed by the hypothesis tests in this crate. Dispersion is reported with
/// the unbiased (`n - 1`) estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStats {
    /// Number of values in the sample.
    pub count: usize,
    /// The minimum value in the sample.
    pub min: f64,
    /// The maximum value in the sample.
    pub max: f64,
    /// The arithmetic mean of the sample.
    pub mean: f64,
    /// The unbiased sample variance, `None` for a single value.
    pub variance: Option<f64>,
}

impl SampleStats {
    /// Computes sample statistics from values.
    ///
    /// # Returns
    ///
    /// * `Some(SampleStats)` - if the dataset contains at least one value
    /// * `None` - if the dataset is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use expeval_stats::descriptive::SampleStats;
    /// let stats = SampleStats::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
    /// assert_eq!(stats.count, 8);
    /// assert_eq!(stats.mean, 5.0);
    /// assert!((stats.variance.unwrap() - 32.0 / 7.0).abs() < 1e-12);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        let count = values.len();
        let mean = mean(&values)?;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let variance = (count > 1).then(|| {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64
        });

        Some(Self {
            count,
            min,
            max,
            mean,
            variance,
        })
    }

    /// Returns the sample standard deviation.
    #[must_use]
    pub fn std_dev(&self) -> Option<f64> {
        self.variance.map(f64::sqrt)
    }

    /// Returns the squared standard error of the mean (`variance / n`).
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn squared_std_error(&self) -> Option<f64> {
        self.variance.map(|v| v / self.count as f64)
    }
}

/// Arithmetic mean of `values`, `None` when empty.
///
/// ```
/// # use expeval_stats::descriptive::mean;
/// assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
/// assert_eq!(mean(&[]), None);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values() {
        assert!(SampleStats::new(Vec::<f64>::new()).is_none());
    }

    #[test]
    fn test_single_value_has_no_variance() {
        let stats = SampleStats::new([3.5]).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, 3.5);
        assert_eq!(stats.min, 3.5);
        assert_eq!(stats.max, 3.5);
        assert!(stats.variance.is_none());
        assert!(stats.std_dev().is_none());
    }

    #[test]
    fn test_unbiased_variance() {
        let stats = SampleStats::new([1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.mean, 2.5);
        // Sum of squared deviations is 5.0 over 3 degrees of freedom
        assert!((stats.variance.unwrap() - 5.0 / 3.0).abs() < 1e-12);
        assert!((stats.squared_std_error().unwrap() - 5.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_min_max_unsorted() {
        let stats = SampleStats::new([5.0, -2.0, 4.0, 1.0]).unwrap();
        assert_eq!(stats.min, -2.0);
        assert_eq!(stats.max, 5.0);
    }
}
