//! Numerical building blocks for experiment evaluation.
//!
//! This crate provides a small collection of statistical tools:
//!
//! - **Sample statistics**: mean, unbiased variance, standard error
//! - **Covariance**: the 2×2 sample covariance matrix of paired series
//! - **Welch's t-test**: two-sample test for a difference in means under unequal variances
//! - **Weighted least squares**: linear regression with row weights and coefficient inference
//! - **Reference distributions**: two-sided Student-t p-values
//!
//! # Modules
//!
//! - [`descriptive`]: Sample statistics for summarizing datasets
//! - [`covariance`]: Covariance matrix of two series
//! - [`welch`]: Welch's unequal-variance t-test
//! - [`regression`]: Weighted least squares fitting
//! - [`distribution`]: p-values from the Student-t distribution
//!
//! # Examples
//!
//! ## Comparing two samples
//!
//! ```
//! use expeval_stats::welch::WelchTest;
//!
//! let control = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let treatment = [2.0, 4.0, 6.0, 8.0, 10.0];
//! let test = WelchTest::new(&control, &treatment).unwrap();
//! assert!(test.p_value > 0.05);
//! ```
//!
//! ## Estimating a regression slope
//!
//! ```
//! use expeval_stats::covariance::CovarianceMatrix;
//!
//! let y = [2.1, 3.9, 6.2, 7.8];
//! let x = [1.0, 2.0, 3.0, 4.0];
//! let theta = CovarianceMatrix::new(&y, &x).unwrap().slope();
//! assert!((theta - 1.94).abs() < 1e-9);
//! ```

pub mod covariance;
pub mod descriptive;
pub mod distribution;
pub mod regression;
pub mod welch;
