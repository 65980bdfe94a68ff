use clap::{Parser, Subcommand};

use self::{
    evaluate::EvaluateArg, fetch::FetchArg, sample::SampleArg, simulate_cuped::SimulateCupedArg,
    simulate_panel::SimulatePanelArg,
};

mod evaluate;
mod fetch;
mod sample;
mod simulate_cuped;
mod simulate_panel;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Generate cross-sectional data with a pre-experiment covariate
    SimulateCuped(#[clap(flatten)] SimulateCupedArg),
    /// Generate a unit × day panel
    SimulatePanel(#[clap(flatten)] SimulatePanelArg),
    /// Keep a random subset of units and the earliest periods of a panel
    Sample(#[clap(flatten)] SampleArg),
    /// Run a warehouse query through the file cache
    Fetch(#[clap(flatten)] FetchArg),
    /// Test metrics for a treatment effect
    Evaluate(#[clap(flatten)] EvaluateArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::SimulateCuped(arg) => simulate_cuped::run(&arg)?,
        Mode::SimulatePanel(arg) => simulate_panel::run(&arg)?,
        Mode::Sample(arg) => sample::run(&arg)?,
        Mode::Fetch(arg) => fetch::run(&arg)?,
        Mode::Evaluate(arg) => evaluate::run(&arg)?,
    }
    Ok(())
}
