//! Subsetting a panel dataset by unit and time.
//!
//! A panel table holds one row per unit and period. [`select_sample`] keeps a
//! random subset of units and the earliest periods, which is handy for
//! prototyping an analysis on a fraction of a large export.

use std::collections::BTreeSet;

use rand::SeedableRng as _;
use rand_pcg::Pcg64;

use crate::{
    column::{CellKey, Column},
    table::ObservationTable,
};

/// Seed used when the caller has no preference, shared by unit selection
/// and the synthetic data generators.
pub const DEFAULT_SEED: u64 = 2312;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SampleError {
    #[display("column '{name}' not found")]
    MissingColumn { name: String },
    #[display("requested {requested} units but only {available} are available")]
    TooManyUnits { requested: usize, available: usize },
}

/// Which part of a panel to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSpec {
    /// Number of units to draw without replacement; `None` keeps every unit.
    pub num_units: Option<usize>,
    /// Number of earliest periods to keep; `None` keeps every period.
    pub num_periods: Option<usize>,
    /// Seed of the unit draw.
    pub seed: u64,
    pub unit_column: String,
    pub period_column: String,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            num_units: None,
            num_periods: None,
            seed: DEFAULT_SEED,
            unit_column: "id".to_owned(),
            period_column: "timeframe".to_owned(),
        }
    }
}

/// Selects a subset of units and periods from a panel table.
///
/// Units are drawn uniformly without replacement from the distinct values of
/// the unit column, using a generator seeded with `spec.seed`, so the same
/// spec always selects the same units. Periods are the first
/// `spec.num_periods` distinct values of the period column in ascending order;
/// asking for more periods than exist keeps them all.
///
/// A column is only required when its dimension is restricted. Rows with a
/// missing key in a restricted dimension are dropped. Row order is preserved.
///
/// # Examples
///
/// ```
/// use expeval_table::{ObservationTable, sampling::{SampleSpec, select_sample}};
///
/// let table = ObservationTable::new()
///     .with_column("id", vec!["a", "a", "b", "b", "c", "c"])?
///     .with_column("timeframe", vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0])?;
///
/// let spec = SampleSpec {
///     num_units: Some(2),
///     num_periods: Some(1),
///     ..SampleSpec::default()
/// };
/// let sample = select_sample(&table, &spec)?;
/// assert_eq!(sample.num_rows(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn select_sample(
    table: &ObservationTable,
    spec: &SampleSpec,
) -> Result<ObservationTable, SampleError> {
    let unit_filter = spec
        .num_units
        .map(|n| {
            let column = require(table, &spec.unit_column)?;
            let units = distinct_in_order(column);
            if n > units.len() {
                return Err(SampleError::TooManyUnits {
                    requested: n,
                    available: units.len(),
                });
            }
            let mut rng = Pcg64::seed_from_u64(spec.seed);
            let chosen = rand::seq::index::sample(&mut rng, units.len(), n)
                .into_iter()
                .map(|i| units[i].clone())
                .collect::<BTreeSet<_>>();
            Ok((column, chosen))
        })
        .transpose()?;

    let period_filter = spec
        .num_periods
        .map(|n| {
            let column = require(table, &spec.period_column)?;
            let periods = (0..column.len())
                .filter_map(|row| column.key(row))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .take(n)
                .collect::<BTreeSet<_>>();
            Ok((column, periods))
        })
        .transpose()?;

    let indices = (0..table.num_rows())
        .filter(|&row| keeps(unit_filter.as_ref(), row) && keeps(period_filter.as_ref(), row))
        .collect::<Vec<_>>();
    Ok(table.take_rows(&indices))
}

fn keeps(filter: Option<&(&Column, BTreeSet<CellKey>)>, row: usize) -> bool {
    filter.is_none_or(|(column, keys)| column.key(row).is_some_and(|key| keys.contains(&key)))
}

fn require<'a>(table: &'a ObservationTable, name: &str) -> Result<&'a Column, SampleError> {
    table.column(name).ok_or_else(|| SampleError::MissingColumn {
        name: name.to_owned(),
    })
}

fn distinct_in_order(column: &Column) -> Vec<CellKey> {
    let mut seen = BTreeSet::new();
    (0..column.len())
        .filter_map(|row| column.key(row))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}
