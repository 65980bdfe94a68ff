use expeval_table::TableError;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum SimulationError {
    #[display("probability {value} is outside [0, 1]")]
    InvalidProbability { value: f64 },
    #[display("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[display("{what} must be at least 1")]
    EmptyShape { what: &'static str },
    #[display("a treatment effect requires assignment columns")]
    EffectWithoutAssignment,
    #[display("period {period} is past the last representable date")]
    DateOverflow { period: usize },
    #[display("failed to build table: {source}")]
    Table { source: TableError },
}

impl From<TableError> for SimulationError {
    fn from(source: TableError) -> Self {
        Self::Table { source }
    }
}
