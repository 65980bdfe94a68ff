//! Reference distributions for test statistics.

use statrs::distribution::{ContinuousCDF as _, StudentsT};

/// Two-sided p-value of a t statistic with `df` degrees of freedom.
///
/// Uses the survival function rather than `1 - cdf` so that very small
/// p-values do not collapse to zero prematurely. A `NaN` statistic (a zero
/// effect over a zero standard error) carries no evidence against the null
/// and maps to 1.
///
/// Returns `None` if `df` is not a positive finite number.
///
/// # Examples
///
/// ```
/// use expeval_stats::distribution::student_t_two_sided_p_value;
///
/// let p = student_t_two_sided_p_value(0.0, 10.0).unwrap();
/// assert!((p - 1.0).abs() < 1e-12);
///
/// // Critical value of t(10) at the 5% level
/// let p = student_t_two_sided_p_value(2.228_138_851_986_273_5, 10.0).unwrap();
/// assert!((p - 0.05).abs() < 1e-6);
/// ```
#[must_use]
pub fn student_t_two_sided_p_value(t: f64, df: f64) -> Option<f64> {
    if !df.is_finite() || df <= 0.0 {
        return None;
    }
    if t.is_nan() {
        return Some(1.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * dist.sf(t.abs())).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_degrees_of_freedom() {
        assert!(student_t_two_sided_p_value(1.0, 0.0).is_none());
        assert!(student_t_two_sided_p_value(1.0, -3.0).is_none());
        assert!(student_t_two_sided_p_value(1.0, f64::NAN).is_none());
    }

    #[test]
    fn test_symmetric_in_sign() {
        let p1 = student_t_two_sided_p_value(1.7, 25.0).unwrap();
        let p2 = student_t_two_sided_p_value(-1.7, 25.0).unwrap();
        assert_eq!(p1, p2);
    }

    #[test]
    fn test_infinite_statistic() {
        assert_eq!(student_t_two_sided_p_value(f64::INFINITY, 5.0), Some(0.0));
    }

    #[test]
    fn test_nan_statistic() {
        assert_eq!(student_t_two_sided_p_value(f64::NAN, 5.0), Some(1.0));
    }

    #[test]
    fn test_large_df_approaches_normal() {
        // 1.959964 is the two-sided 5% critical value of the standard normal
        let p = student_t_two_sided_p_value(1.959_964, 1.0e4).unwrap();
        assert!((p - 0.05).abs() < 1e-4);
    }
}
