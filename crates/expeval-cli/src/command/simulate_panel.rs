use std::path::PathBuf;

use anyhow::Context as _;
use chrono::NaiveDate;
use expeval_simulation::{DEFAULT_SEED, PanelDgp};

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimulatePanelArg {
    /// Number of units
    #[arg(long, default_value_t = 1000)]
    units: usize,
    /// Number of daily periods per unit
    #[arg(long, default_value_t = 50)]
    periods: usize,
    /// Upper bound of the uniform per-unit effect
    #[arg(long, default_value_t = 0.1)]
    max_unit_effect: f64,
    /// Name of the metric column
    #[arg(long, default_value = "y")]
    metric_name: String,
    /// Add treatment indicator, label and weight columns
    #[arg(long)]
    add_assignment: bool,
    /// Average each unit's rows into a single row
    #[arg(long)]
    cross_section: bool,
    /// Add a pre-experiment column for the metric
    #[arg(long)]
    with_pre_period: bool,
    /// Lift added to the metric of treated units
    #[arg(long, default_value_t = 0.0)]
    treatment_effect: f64,
    /// First period
    #[arg(long, default_value = "2023-01-01")]
    start_date: NaiveDate,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Column naming configuration (JSON)
    #[arg(long)]
    columns: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &SimulatePanelArg) -> anyhow::Result<()> {
    let columns = util::read_columns_file(arg.columns.as_deref())?;
    let dgp = PanelDgp {
        units: arg.units,
        periods: arg.periods,
        max_unit_effect: arg.max_unit_effect,
        metric_name: arg.metric_name.clone(),
        add_assignment: arg.add_assignment,
        cross_section: arg.cross_section,
        with_pre_period: arg.with_pre_period,
        treatment_effect: arg.treatment_effect,
        start_date: arg.start_date,
        seed: arg.seed,
    };
    tracing::info!(
        units = dgp.units,
        periods = dgp.periods,
        cross_section = dgp.cross_section,
        "simulating panel data"
    );
    let table = dgp
        .make_data(&columns)
        .context("Failed to simulate panel")?;
    Output::save_json(&table, arg.output.clone())
}
