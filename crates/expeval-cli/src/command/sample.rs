use std::path::PathBuf;

use anyhow::Context as _;
use expeval_table::sampling::{self, DEFAULT_SEED, SampleSpec};

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SampleArg {
    /// Input table (JSON)
    #[arg(long)]
    input: PathBuf,
    /// Number of units to keep; all units when omitted
    #[arg(long)]
    num_units: Option<usize>,
    /// Number of earliest periods to keep; all periods when omitted
    #[arg(long)]
    num_periods: Option<usize>,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    #[arg(long, default_value = "id")]
    unit_column: String,
    #[arg(long, default_value = "timeframe")]
    period_column: String,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &SampleArg) -> anyhow::Result<()> {
    let table = util::read_table_file(&arg.input)?;
    let spec = SampleSpec {
        num_units: arg.num_units,
        num_periods: arg.num_periods,
        seed: arg.seed,
        unit_column: arg.unit_column.clone(),
        period_column: arg.period_column.clone(),
    };
    let sample = sampling::select_sample(&table, &spec).context("Failed to sample table")?;
    tracing::info!(
        rows = sample.num_rows(),
        from = table.num_rows(),
        "selected sample"
    );
    Output::save_json(&sample, arg.output.clone())
}
