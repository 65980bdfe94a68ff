//! Synthetic experiment data.
//!
//! Two seeded data generating processes produce tables that satisfy the
//! column contracts of the evaluator:
//!
//! - [`CupedDgp`]: one row per unit with a pre-experiment covariate that
//!   explains most of the outcome, for exercising variance reduction
//! - [`PanelDgp`]: a unit × day panel with per-unit effects, optionally
//!   collapsed to one row per unit
//!
//! Both generators draw every random number from a single [`Pcg64`] stream
//! seeded by the caller, so a given configuration always yields the same table.
//!
//! [`Pcg64`]: rand_pcg::Pcg64

pub use expeval_table::sampling::DEFAULT_SEED;

pub use self::{cuped::CupedDgp, error::SimulationError, panel::PanelDgp};

mod cuped;
mod error;
mod panel;

fn unit_id(index: usize) -> String {
    format!("unit_{index}")
}
