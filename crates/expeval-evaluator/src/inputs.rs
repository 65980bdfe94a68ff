//! Column validation at the table boundary.
//!
//! Each helper resolves one experiment column and checks its contract,
//! failing with [`EvaluationError::InvalidInput`] before any statistic is
//! computed.

use expeval_table::{Column, ExperimentColumns, ObservationTable};

use crate::error::{EvaluationError, InputProblem};

/// Present value of a numeric cell; `NaN` counts as missing.
pub(crate) fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}

fn column<'a>(table: &'a ObservationTable, name: &str) -> Result<&'a Column, EvaluationError> {
    table
        .column(name)
        .ok_or_else(|| EvaluationError::invalid(name, InputProblem::MissingColumn))
}

/// Numeric column with missing cells normalized to `None`.
pub(crate) fn numeric(
    table: &ObservationTable,
    name: &str,
) -> Result<Vec<Option<f64>>, EvaluationError> {
    let column = column(table, name)?;
    let values = column.as_numeric().ok_or_else(|| {
        EvaluationError::invalid(
            name,
            InputProblem::WrongKind {
                expected: "numeric",
                found: column.kind(),
            },
        )
    })?;
    Ok(values.iter().copied().map(present).collect())
}

/// Treatment indicator: a boolean column, or a numeric column of 0/1 values.
pub(crate) fn treatment_indicator(
    table: &ObservationTable,
    name: &str,
) -> Result<Vec<bool>, EvaluationError> {
    let missing = |row| EvaluationError::invalid(name, InputProblem::MissingValue { row });
    match column(table, name)? {
        Column::Boolean(values) => values
            .iter()
            .enumerate()
            .map(|(row, v)| v.ok_or_else(|| missing(row)))
            .collect(),
        Column::Numeric(values) => values
            .iter()
            .enumerate()
            .map(|(row, v)| match present(*v) {
                None => Err(missing(row)),
                Some(value) if value == 0.0 => Ok(false),
                Some(value) if value == 1.0 => Ok(true),
                Some(value) => Err(EvaluationError::invalid(
                    name,
                    InputProblem::NotBinary { row, value },
                )),
            })
            .collect(),
        other => Err(EvaluationError::invalid(
            name,
            InputProblem::WrongKind {
                expected: "boolean or 0/1 numeric",
                found: other.kind(),
            },
        )),
    }
}

/// Row weights: numeric, present, finite and non-negative.
pub(crate) fn weights(table: &ObservationTable, name: &str) -> Result<Vec<f64>, EvaluationError> {
    numeric(table, name)?
        .into_iter()
        .enumerate()
        .map(|(row, weight)| match weight {
            None => Err(EvaluationError::invalid(
                name,
                InputProblem::MissingValue { row },
            )),
            Some(w) if !w.is_finite() || w < 0.0 => Err(EvaluationError::invalid(
                name,
                InputProblem::InvalidWeight { row, weight: w },
            )),
            Some(w) => Ok(w),
        })
        .collect()
}

/// Group membership from the assignment label column (`true` = treatment).
pub(crate) fn assignment_groups(
    table: &ObservationTable,
    columns: &ExperimentColumns,
) -> Result<Vec<bool>, EvaluationError> {
    let name = columns.assignment.as_str();
    let column = column(table, name)?;
    let labels = column.as_categorical().ok_or_else(|| {
        EvaluationError::invalid(
            name,
            InputProblem::WrongKind {
                expected: "categorical",
                found: column.kind(),
            },
        )
    })?;
    labels
        .iter()
        .enumerate()
        .map(|(row, label)| match label.as_deref() {
            None => Err(EvaluationError::invalid(
                name,
                InputProblem::MissingValue { row },
            )),
            Some(label) if label == columns.control_label => Ok(false),
            Some(label) if label == columns.treatment_label => Ok(true),
            Some(label) => Err(EvaluationError::invalid(
                name,
                InputProblem::UnknownLabel {
                    row,
                    label: label.to_owned(),
                },
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_indicator() {
        let table = ObservationTable::new()
            .with_column("d", vec![0.0, 1.0, 1.0])
            .unwrap();
        assert_eq!(
            treatment_indicator(&table, "d").unwrap(),
            vec![false, true, true]
        );
    }

    #[test]
    fn test_indicator_rejects_other_values() {
        let table = ObservationTable::new()
            .with_column("d", vec![0.0, 2.0])
            .unwrap();
        assert_eq!(
            treatment_indicator(&table, "d"),
            Err(EvaluationError::invalid(
                "d",
                InputProblem::NotBinary { row: 1, value: 2.0 }
            ))
        );

        let table = ObservationTable::new()
            .with_column("d", Column::Boolean(vec![Some(true), None]))
            .unwrap();
        assert_eq!(
            treatment_indicator(&table, "d"),
            Err(EvaluationError::invalid(
                "d",
                InputProblem::MissingValue { row: 1 }
            ))
        );
    }

    #[test]
    fn test_negative_weight() {
        let table = ObservationTable::new()
            .with_column("w", vec![1.0, -0.5])
            .unwrap();
        assert!(matches!(
            weights(&table, "w"),
            Err(EvaluationError::InvalidInput {
                problem: InputProblem::InvalidWeight { row: 1, .. },
                ..
            })
        ));
    }

    #[test]
    fn test_assignment_labels() {
        let columns = ExperimentColumns::default();
        let table = ObservationTable::new()
            .with_column("assignments", vec!["control", "treatment", "control"])
            .unwrap();
        assert_eq!(
            assignment_groups(&table, &columns).unwrap(),
            vec![false, true, false]
        );

        let table = ObservationTable::new()
            .with_column("assignments", vec!["control", "holdout"])
            .unwrap();
        assert!(matches!(
            assignment_groups(&table, &columns),
            Err(EvaluationError::InvalidInput {
                problem: InputProblem::UnknownLabel { row: 1, .. },
                ..
            })
        ));
    }

    #[test]
    fn test_wrong_kind() {
        let table = ObservationTable::new()
            .with_column("metric", vec!["a", "b"])
            .unwrap();
        assert!(matches!(
            numeric(&table, "metric"),
            Err(EvaluationError::InvalidInput {
                problem: InputProblem::WrongKind { .. },
                ..
            })
        ));
        assert!(matches!(
            numeric(&table, "absent"),
            Err(EvaluationError::InvalidInput {
                problem: InputProblem::MissingColumn,
                ..
            })
        ));
    }
}
