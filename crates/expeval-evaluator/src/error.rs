use expeval_table::ColumnKind;

/// Failure of an evaluation call.
///
/// Rows with missing outcome or covariate values are never an error; they
/// are silently excluded from the computation that needs them.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::IsVariant)]
pub enum EvaluationError {
    /// A required column is absent, has the wrong type or holds values
    /// outside its contract.
    #[display("invalid input in column '{column}': {problem}")]
    InvalidInput { column: String, problem: InputProblem },
    /// Too few usable observations to compute the statistic.
    #[display("insufficient data: {reason}")]
    InsufficientData { reason: String },
    /// The pre-experiment covariate is constant, so the CUPED coefficient is
    /// undefined.
    #[display("pre-experiment covariate '{column}' has zero variance")]
    DegenerateCovariate { column: String },
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum InputProblem {
    #[display("column is missing")]
    MissingColumn,
    #[display("expected a {expected} column, found {found}")]
    WrongKind {
        expected: &'static str,
        found: ColumnKind,
    },
    #[display("missing value at row {row}")]
    MissingValue { row: usize },
    #[display("unexpected label '{label}' at row {row}")]
    UnknownLabel { row: usize, label: String },
    #[display("value {value} at row {row} is not a 0/1 indicator")]
    NotBinary { row: usize, value: f64 },
    #[display("weight {weight} at row {row} is negative or not finite")]
    InvalidWeight { row: usize, weight: f64 },
    #[display("value at row {row} is not finite")]
    NonFinite { row: usize },
}

impl EvaluationError {
    /// Short machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::DegenerateCovariate { .. } => "degenerate_covariate",
        }
    }

    pub(crate) fn invalid(column: &str, problem: InputProblem) -> Self {
        Self::InvalidInput {
            column: column.to_owned(),
            problem,
        }
    }

    pub(crate) fn insufficient(reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            reason: reason.into(),
        }
    }
}
