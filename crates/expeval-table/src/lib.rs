//! Tabular data model for experiment datasets.
//!
//! An [`ObservationTable`] is the in-memory dataset every other crate in the
//! workspace consumes: one row per experimental unit (or unit-period), typed
//! columns, and missing values represented explicitly.
//!
//! # Overview
//!
//! - [`ObservationTable`]: ordered named columns of equal length, JSON (de)serializable
//! - [`Column`]: numeric, boolean, categorical or date cells, each optionally missing
//! - [`ExperimentColumns`]: configurable names of the assignment, treatment, weight
//!   and pre-period columns
//! - [`sampling`]: seeded unit/period subsetting of panel tables
//!
//! # Serialization
//!
//! Tables serialize column-wise:
//!
//! ```json
//! {
//!   "columns": [
//!     { "name": "id", "column": { "type": "categorical", "values": ["unit_0", "unit_1"] } },
//!     { "name": "y", "column": { "type": "numeric", "values": [20.4, null] } }
//!   ]
//! }
//! ```
//!
//! Deserialization rejects duplicate names and columns of unequal length.

pub use self::{
    column::{CellKey, Column, ColumnKind},
    schema::ExperimentColumns,
    table::{NamedColumn, ObservationTable, TableError},
};

pub mod column;
pub mod sampling;
pub mod schema;
pub mod table;
