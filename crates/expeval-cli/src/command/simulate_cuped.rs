use std::path::PathBuf;

use anyhow::Context as _;
use expeval_simulation::{CupedDgp, DEFAULT_SEED};

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimulateCupedArg {
    /// Number of units
    #[arg(long, default_value_t = 1000)]
    n: usize,
    /// Probability that a unit is treated
    #[arg(long, default_value_t = 0.5)]
    p: f64,
    /// Mean of the pre-experiment metric
    #[arg(long, default_value_t = 20.0)]
    mu: f64,
    /// Standard deviation of the pre-experiment metric
    #[arg(long, default_value_t = 4.0)]
    sigma: f64,
    /// True treatment effect
    #[arg(long, default_value_t = 2.0)]
    beta: f64,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Column naming configuration (JSON)
    #[arg(long)]
    columns: Option<PathBuf>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &SimulateCupedArg) -> anyhow::Result<()> {
    let columns = util::read_columns_file(arg.columns.as_deref())?;
    let dgp = CupedDgp {
        mu: arg.mu,
        sigma: arg.sigma,
        beta: arg.beta,
    };
    tracing::info!(n = arg.n, p = arg.p, seed = arg.seed, "simulating cuped data");
    let table = dgp
        .make_data(arg.n, arg.p, arg.seed, &columns)
        .context("Failed to simulate data")?;
    Output::save_json(&table, arg.output.clone())
}
