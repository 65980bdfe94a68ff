use std::iter;

use chrono::{Days, NaiveDate};
use expeval_table::{ExperimentColumns, ObservationTable};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg64;

use crate::{DEFAULT_SEED, SimulationError, unit_id};

/// Unit × day panel with persistent unit effects.
///
/// Every unit draws an effect `u ~ Uniform(0, max_unit_effect)` once; each of
/// its rows then gets `metric = Uniform(0, 1) + u`. A larger unit effect makes
/// pre-period values more predictive of the experiment period, which is what
/// CUPED exploits.
///
/// Optional parts:
///
/// - `add_assignment`: a unit-level fair coin decides treatment; the
///   indicator, group label and a unit weight are added
/// - `treatment_effect`: added to the metric of treated units (requires
///   `add_assignment`)
/// - `with_pre_period`: a `{metric}_pre` column drawn like the metric from the
///   same unit effect but without treatment
/// - `cross_section`: rows are averaged per unit and the period column is
///   dropped
#[derive(Debug, Clone, PartialEq)]
pub struct PanelDgp {
    pub units: usize,
    pub periods: usize,
    pub max_unit_effect: f64,
    pub metric_name: String,
    pub add_assignment: bool,
    pub cross_section: bool,
    pub with_pre_period: bool,
    pub treatment_effect: f64,
    /// Date of the first period; periods are consecutive days.
    pub start_date: NaiveDate,
    pub seed: u64,
}

impl Default for PanelDgp {
    fn default() -> Self {
        Self {
            units: 100_000,
            periods: 50,
            max_unit_effect: 0.1,
            metric_name: "y".to_owned(),
            add_assignment: false,
            cross_section: false,
            with_pre_period: false,
            treatment_effect: 0.0,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            seed: DEFAULT_SEED,
        }
    }
}

/// Draws of one unit.
struct Unit {
    treated: bool,
    metric: Vec<f64>,
    pre: Vec<f64>,
}

impl PanelDgp {
    /// Name of the period column.
    pub const PERIOD_COLUMN: &'static str = "timeframe";

    /// Generates the panel.
    ///
    /// Rows are ordered by unit, then by period. Assignment columns use the
    /// names in `columns`.
    ///
    /// # Examples
    ///
    /// ```
    /// use expeval_simulation::PanelDgp;
    /// use expeval_table::ExperimentColumns;
    ///
    /// let dgp = PanelDgp {
    ///     units: 10,
    ///     periods: 7,
    ///     add_assignment: true,
    ///     ..PanelDgp::default()
    /// };
    /// let panel = dgp.make_data(&ExperimentColumns::default())?;
    /// assert_eq!(panel.num_rows(), 70);
    ///
    /// let cross_section = PanelDgp { cross_section: true, ..dgp }.make_data(&ExperimentColumns::default())?;
    /// assert_eq!(cross_section.num_rows(), 10);
    /// assert!(cross_section.column("timeframe").is_none());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn make_data(&self, columns: &ExperimentColumns) -> Result<ObservationTable, SimulationError> {
        self.validate()?;
        let dates = (0..self.periods)
            .map(|period| {
                self.start_date
                    .checked_add_days(Days::new(period as u64))
                    .ok_or(SimulationError::DateOverflow { period })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut rng = Pcg64::seed_from_u64(self.seed);
        let units = (0..self.units)
            .map(|_| {
                let effect = rng.random::<f64>() * self.max_unit_effect;
                let treated = self.add_assignment && rng.random_bool(0.5);
                let lift = if treated { self.treatment_effect } else { 0.0 };
                let metric = (0..self.periods)
                    .map(|_| rng.random::<f64>() + effect + lift)
                    .collect();
                let pre = if self.with_pre_period {
                    (0..self.periods)
                        .map(|_| rng.random::<f64>() + effect)
                        .collect()
                } else {
                    vec![]
                };
                Unit {
                    treated,
                    metric,
                    pre,
                }
            })
            .collect::<Vec<_>>();

        if self.cross_section {
            self.cross_section_table(&units, columns)
        } else {
            self.panel_table(&units, &dates, columns)
        }
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if self.units == 0 {
            return Err(SimulationError::EmptyShape { what: "units" });
        }
        if self.periods == 0 {
            return Err(SimulationError::EmptyShape { what: "periods" });
        }
        if !self.max_unit_effect.is_finite() || self.max_unit_effect < 0.0 {
            return Err(SimulationError::InvalidParameter {
                name: "max_unit_effect",
                value: self.max_unit_effect,
            });
        }
        if !self.treatment_effect.is_finite() {
            return Err(SimulationError::InvalidParameter {
                name: "treatment_effect",
                value: self.treatment_effect,
            });
        }
        if self.treatment_effect != 0.0 && !self.add_assignment {
            return Err(SimulationError::EffectWithoutAssignment);
        }
        Ok(())
    }

    fn panel_table(
        &self,
        units: &[Unit],
        dates: &[NaiveDate],
        columns: &ExperimentColumns,
    ) -> Result<ObservationTable, SimulationError> {
        let ids = (0..units.len())
            .flat_map(|index| iter::repeat_n(unit_id(index), self.periods))
            .collect::<Vec<_>>();

        let mut table = ObservationTable::new();
        table.push_column("id", ids)?;
        table.push_column(Self::PERIOD_COLUMN, dates.repeat(units.len()))?;
        table.push_column(
            self.metric_name.as_str(),
            units.iter().flat_map(|u| u.metric.iter().copied()).collect::<Vec<_>>(),
        )?;
        if self.with_pre_period {
            table.push_column(
                columns.pre_metric(&self.metric_name),
                units.iter().flat_map(|u| u.pre.iter().copied()).collect::<Vec<_>>(),
            )?;
        }
        if self.add_assignment {
            let treated = units
                .iter()
                .flat_map(|u| iter::repeat_n(u.treated, self.periods))
                .collect::<Vec<_>>();
            push_assignment(&mut table, treated, columns)?;
        }
        Ok(table)
    }

    #[expect(clippy::cast_precision_loss)]
    fn cross_section_table(
        &self,
        units: &[Unit],
        columns: &ExperimentColumns,
    ) -> Result<ObservationTable, SimulationError> {
        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;

        let mut table = ObservationTable::new();
        table.push_column("id", (0..units.len()).map(unit_id).collect::<Vec<_>>())?;
        table.push_column(
            self.metric_name.as_str(),
            units.iter().map(|u| mean(&u.metric)).collect::<Vec<_>>(),
        )?;
        if self.with_pre_period {
            table.push_column(
                columns.pre_metric(&self.metric_name),
                units.iter().map(|u| mean(&u.pre)).collect::<Vec<_>>(),
            )?;
        }
        if self.add_assignment {
            let treated = units.iter().map(|u| u.treated).collect();
            push_assignment(&mut table, treated, columns)?;
        }
        Ok(table)
    }
}

fn push_assignment(
    table: &mut ObservationTable,
    treated: Vec<bool>,
    columns: &ExperimentColumns,
) -> Result<(), SimulationError> {
    let labels = treated
        .iter()
        .map(|&d| columns.label(d).to_owned())
        .collect::<Vec<_>>();
    let n = treated.len();
    table.push_column(columns.is_treated.as_str(), treated)?;
    table.push_column(columns.assignment.as_str(), labels)?;
    table.push_column(columns.weight.as_str(), vec![1.0; n])?;
    Ok(())
}
