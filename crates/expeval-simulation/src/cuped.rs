use expeval_table::{ExperimentColumns, ObservationTable};
use rand::{Rng as _, SeedableRng as _};
use rand_distr::Normal;
use rand_pcg::Pcg64;

use crate::{SimulationError, unit_id};

/// Cross-sectional data with a strongly predictive pre-experiment covariate.
///
/// For each unit:
///
/// ```text
/// x ~ Normal(mu, sigma)
/// d ~ Bernoulli(p)
/// y = x + beta·d + Normal(2, 2)
/// ```
///
/// `beta` is the true treatment effect; `x` is emitted as the pre-period
/// column of `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CupedDgp {
    pub mu: f64,
    pub sigma: f64,
    pub beta: f64,
}

impl Default for CupedDgp {
    fn default() -> Self {
        Self {
            mu: 20.0,
            sigma: 4.0,
            beta: 2.0,
        }
    }
}

impl CupedDgp {
    /// Name of the outcome column.
    pub const METRIC: &'static str = "y";

    /// Draws `n` units, each treated with probability `p`.
    ///
    /// The table has an `id` column, the outcome [`METRIC`](Self::METRIC), its
    /// pre-period covariate and the three assignment columns named by
    /// `columns` (boolean indicator, group label, unit weight).
    ///
    /// # Examples
    ///
    /// ```
    /// use expeval_simulation::CupedDgp;
    /// use expeval_table::ExperimentColumns;
    ///
    /// let table = CupedDgp::default().make_data(100, 0.5, 2312, &ExperimentColumns::default())?;
    /// assert_eq!(table.num_rows(), 100);
    /// assert!(table.column("y_pre").is_some());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn make_data(
        &self,
        n: usize,
        p: f64,
        seed: u64,
        columns: &ExperimentColumns,
    ) -> Result<ObservationTable, SimulationError> {
        if n == 0 {
            return Err(SimulationError::EmptyShape { what: "n" });
        }
        if !(0.0..=1.0).contains(&p) {
            return Err(SimulationError::InvalidProbability { value: p });
        }
        let invalid_sigma = SimulationError::InvalidParameter {
            name: "sigma",
            value: self.sigma,
        };
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(invalid_sigma);
        }
        let covariate = Normal::new(self.mu, self.sigma).map_err(|_| invalid_sigma.clone())?;
        let noise = Normal::new(2.0, 2.0).map_err(|_| invalid_sigma)?;

        let mut rng = Pcg64::seed_from_u64(seed);
        let mut treated = Vec::with_capacity(n);
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for _ in 0..n {
            let d = rng.random_bool(p);
            let pre = rng.sample(covariate);
            let effect = if d { self.beta } else { 0.0 };
            treated.push(d);
            x.push(pre);
            y.push(pre + effect + rng.sample(noise));
        }

        let labels = treated
            .iter()
            .map(|&d| columns.label(d).to_owned())
            .collect::<Vec<_>>();
        let mut table = ObservationTable::new();
        table.push_column("id", (0..n).map(unit_id).collect::<Vec<_>>())?;
        table.push_column(Self::METRIC, y)?;
        table.push_column(columns.pre_metric(Self::METRIC), x)?;
        table.push_column(columns.is_treated.as_str(), treated)?;
        table.push_column(columns.assignment.as_str(), labels)?;
        table.push_column(columns.weight.as_str(), vec![1.0; n])?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use expeval_stats::descriptive::SampleStats;

    use super::*;

    fn numeric(table: &ObservationTable, name: &str) -> Vec<f64> {
        table
            .column(name)
            .and_then(|c| c.as_numeric())
            .unwrap()
            .iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn test_same_seed_same_table() {
        let dgp = CupedDgp::default();
        let columns = ExperimentColumns::default();
        let a = dgp.make_data(50, 0.5, 1, &columns).unwrap();
        let b = dgp.make_data(50, 0.5, 1, &columns).unwrap();
        let c = dgp.make_data(50, 0.5, 2, &columns).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_moments() {
        let table = CupedDgp::default()
            .make_data(5000, 0.5, 2312, &ExperimentColumns::default())
            .unwrap();
        let pre = SampleStats::new(numeric(&table, "y_pre")).unwrap();
        assert!((pre.mean - 20.0).abs() < 0.3);
        assert!((pre.std_dev().unwrap() - 4.0).abs() < 0.3);

        let treated = table.column("is_treated").unwrap().as_boolean().unwrap();
        let share = treated.iter().filter(|d| **d == Some(true)).count();
        assert!((2300..2700).contains(&share));

        let labels = table.column("assignments").unwrap().as_categorical().unwrap();
        for (d, label) in treated.iter().zip(labels) {
            let expected = if *d == Some(true) { "treatment" } else { "control" };
            assert_eq!(label.as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_extreme_probabilities() {
        let columns = ExperimentColumns::default();
        let table = CupedDgp::default().make_data(20, 0.0, 3, &columns).unwrap();
        let treated = table.column("is_treated").unwrap().as_boolean().unwrap();
        assert!(treated.iter().all(|d| *d == Some(false)));

        assert_eq!(
            CupedDgp::default().make_data(20, 1.5, 3, &columns),
            Err(SimulationError::InvalidProbability { value: 1.5 })
        );
    }

    #[test]
    fn test_invalid_parameters() {
        let columns = ExperimentColumns::default();
        let dgp = CupedDgp {
            sigma: 0.0,
            ..CupedDgp::default()
        };
        assert!(matches!(
            dgp.make_data(10, 0.5, 1, &columns),
            Err(SimulationError::InvalidParameter { name: "sigma", .. })
        ));
        assert_eq!(
            CupedDgp::default().make_data(0, 0.5, 1, &columns),
            Err(SimulationError::EmptyShape { what: "n" })
        );
    }

    #[test]
    fn test_custom_column_names() {
        let columns = ExperimentColumns {
            is_treated: "d".to_owned(),
            pre_suffix: "_before".to_owned(),
            ..ExperimentColumns::default()
        };
        let table = CupedDgp::default().make_data(10, 0.5, 1, &columns).unwrap();
        let names = table.column_names().collect::<Vec<_>>();
        assert_eq!(
            names,
            ["id", "y", "y_before", "d", "assignments", "assignments_freq"]
        );
    }
}
