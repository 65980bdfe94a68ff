use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::column::{Column, ColumnKind};

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum TableError {
    #[display("column '{name}' already exists")]
    DuplicateColumn { name: String },
    #[display("column '{name}' has {found} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[display("column '{name}' not found")]
    MissingColumn { name: String },
    #[display("column '{name}' is {found}, expected {expected}")]
    KindMismatch {
        name: String,
        expected: ColumnKind,
        found: ColumnKind,
    },
    #[display("row mask has {found} entries, expected {expected}")]
    MaskLength { expected: usize, found: usize },
    #[display("record {row} is not a JSON object")]
    InvalidRecord { row: usize },
    #[display("column '{name}' mixes value types (row {row})")]
    MixedTypes { name: String, row: usize },
    #[display("cannot parse '{value}' in column '{name}' (row {row}) as {expected}")]
    InvalidText {
        name: String,
        row: usize,
        value: String,
        expected: ColumnKind,
    },
}

/// A named column of an [`ObservationTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedColumn {
    pub name: String,
    pub column: Column,
}

/// In-memory tabular dataset: ordered, uniquely named columns of equal length.
///
/// Each row is one experimental unit (or unit-period). The invariants are
/// checked whenever a column is added, including on deserialization.
///
/// # Examples
///
/// ```
/// use expeval_table::{Column, ObservationTable};
///
/// let table = ObservationTable::new()
///     .with_column("metric", vec![Some(1.0), None, Some(3.0)])?
///     .with_column("is_treated", vec![false, true, true])?;
///
/// assert_eq!(table.num_rows(), 3);
/// assert_eq!(table.column_names().collect::<Vec<_>>(), ["metric", "is_treated"]);
/// assert!(table.column("metric").unwrap().is_missing(1));
/// # Ok::<(), expeval_table::TableError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRepr", into = "TableRepr")]
pub struct ObservationTable {
    num_rows: usize,
    columns: Vec<NamedColumn>,
}

#[derive(Serialize, Deserialize)]
struct TableRepr {
    columns: Vec<NamedColumn>,
}

impl TryFrom<TableRepr> for ObservationTable {
    type Error = TableError;

    fn try_from(repr: TableRepr) -> Result<Self, Self::Error> {
        let mut table = ObservationTable::new();
        for NamedColumn { name, column } in repr.columns {
            table.push_column(name, column)?;
        }
        Ok(table)
    }
}

impl From<ObservationTable> for TableRepr {
    fn from(table: ObservationTable) -> Self {
        TableRepr {
            columns: table.columns,
        }
    }
}

impl ObservationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.column)
    }

    /// Looks up a column, failing with [`TableError::MissingColumn`].
    pub fn require(&self, name: &str) -> Result<&Column, TableError> {
        self.column(name).ok_or_else(|| TableError::MissingColumn {
            name: name.to_owned(),
        })
    }

    /// Appends a column.
    ///
    /// The first column fixes the row count of the table.
    pub fn push_column<S, C>(&mut self, name: S, column: C) -> Result<(), TableError>
    where
        S: Into<String>,
        C: Into<Column>,
    {
        let name = name.into();
        let column = column.into();
        if self.column(&name).is_some() {
            return Err(TableError::DuplicateColumn { name });
        }
        if self.columns.is_empty() {
            self.num_rows = column.len();
        } else if column.len() != self.num_rows {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.num_rows,
                found: column.len(),
            });
        }
        self.columns.push(NamedColumn { name, column });
        Ok(())
    }

    /// Builder-style variant of [`push_column`](Self::push_column).
    pub fn with_column<S, C>(mut self, name: S, column: C) -> Result<Self, TableError>
    where
        S: Into<String>,
        C: Into<Column>,
    {
        self.push_column(name, column)?;
        Ok(self)
    }

    /// Removes and returns a column.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(index).column)
    }

    /// Builds a new table from the rows at `indices`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| NamedColumn {
                name: c.name.clone(),
                column: c.column.take(indices),
            })
            .collect();
        Self {
            num_rows: indices.len(),
            columns,
        }
    }

    /// Keeps the rows whose entry in `mask` is `true`.
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Self, TableError> {
        if mask.len() != self.num_rows {
            return Err(TableError::MaskLength {
                expected: self.num_rows,
                found: mask.len(),
            });
        }
        let indices = mask
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect::<Vec<_>>();
        Ok(self.take_rows(&indices))
    }

    /// Converts a categorical column to a date column using `format`.
    ///
    /// Date columns are left untouched. Missing cells stay missing.
    pub fn parse_dates(&mut self, name: &str, format: &str) -> Result<(), TableError> {
        self.convert_text(name, ColumnKind::Date, Column::Date, |text| {
            NaiveDate::parse_from_str(text, format).ok()
        })
    }

    /// Converts a categorical column of decimal strings to a numeric column.
    ///
    /// Warehouse clients that print JSON often quote every cell, so numbers
    /// arrive as `"1.5"`. Numeric columns are left untouched and missing cells
    /// stay missing; surrounding whitespace is ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use expeval_table::{Column, ObservationTable};
    ///
    /// let mut table = ObservationTable::new().with_column("y", vec!["1.5", " 2 "])?;
    /// table.parse_numeric("y")?;
    /// assert_eq!(table.column("y"), Some(&Column::from(vec![1.5, 2.0])));
    /// # Ok::<(), expeval_table::TableError>(())
    /// ```
    pub fn parse_numeric(&mut self, name: &str) -> Result<(), TableError> {
        self.convert_text(name, ColumnKind::Numeric, Column::Numeric, |text| {
            text.trim().parse::<f64>().ok()
        })
    }

    /// Converts a categorical column to a boolean column.
    ///
    /// Accepts `true`/`false` in any case, and `1`/`0`. Boolean columns are
    /// left untouched and missing cells stay missing.
    pub fn parse_booleans(&mut self, name: &str) -> Result<(), TableError> {
        self.convert_text(name, ColumnKind::Boolean, Column::Boolean, |text| {
            match text.trim() {
                "1" => Some(true),
                "0" => Some(false),
                t if t.eq_ignore_ascii_case("true") => Some(true),
                t if t.eq_ignore_ascii_case("false") => Some(false),
                _ => None,
            }
        })
    }

    fn convert_text<T>(
        &mut self,
        name: &str,
        target: ColumnKind,
        build: fn(Vec<Option<T>>) -> Column,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<(), TableError> {
        let Some(entry) = self.columns.iter_mut().find(|c| c.name == name) else {
            return Err(TableError::MissingColumn {
                name: name.to_owned(),
            });
        };
        let values = match &entry.column {
            column if column.kind() == target => return Ok(()),
            Column::Categorical(values) => values,
            other => {
                return Err(TableError::KindMismatch {
                    name: name.to_owned(),
                    expected: ColumnKind::Categorical,
                    found: other.kind(),
                });
            }
        };
        let parsed = values
            .iter()
            .enumerate()
            .map(|(row, value)| {
                value
                    .as_deref()
                    .map(|text| {
                        parse(text).ok_or_else(|| TableError::InvalidText {
                            name: name.to_owned(),
                            row,
                            value: text.to_owned(),
                            expected: target,
                        })
                    })
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;
        entry.column = build(parsed);
        Ok(())
    }

    /// Builds a table from JSON records (one object per row).
    ///
    /// Column types are inferred from the non-null values: numbers become
    /// numeric columns, booleans boolean columns and strings categorical
    /// columns. Keys absent from a record and `null` values are missing cells.
    /// A column whose values are all missing is numeric.
    ///
    /// # Examples
    ///
    /// ```
    /// use expeval_table::{ColumnKind, ObservationTable};
    /// use serde_json::json;
    ///
    /// let records = [
    ///     json!({ "id": "u1", "metric": 1.5, "is_treated": true }),
    ///     json!({ "id": "u2", "metric": null, "is_treated": false }),
    /// ];
    /// let table = ObservationTable::from_records(&records)?;
    /// assert_eq!(table.num_rows(), 2);
    /// assert_eq!(table.column("id").unwrap().kind(), ColumnKind::Categorical);
    /// assert!(table.column("metric").unwrap().is_missing(1));
    /// # Ok::<(), expeval_table::TableError>(())
    /// ```
    pub fn from_records(records: &[Value]) -> Result<Self, TableError> {
        let mut names: Vec<String> = vec![];
        for (row, record) in records.iter().enumerate() {
            let object = record
                .as_object()
                .ok_or(TableError::InvalidRecord { row })?;
            for key in object.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }

        let mut table = ObservationTable::new();
        for name in names {
            let cells = records
                .iter()
                .map(|record| record.get(&name).unwrap_or(&Value::Null))
                .collect::<Vec<_>>();
            let column = infer_column(&name, &cells)?;
            table.push_column(name, column)?;
        }
        if table.columns.is_empty() {
            table.num_rows = records.len();
        }
        Ok(table)
    }
}

fn infer_column(name: &str, cells: &[&Value]) -> Result<Column, TableError> {
    let mixed = |row| TableError::MixedTypes {
        name: name.to_owned(),
        row,
    };
    let first = cells.iter().find(|v| !v.is_null());
    match first {
        None | Some(Value::Number(_)) => cells
            .iter()
            .enumerate()
            .map(|(row, v)| match v {
                Value::Null => Ok(None),
                Value::Number(n) => Ok(n.as_f64()),
                _ => Err(mixed(row)),
            })
            .collect::<Result<_, _>>()
            .map(Column::Numeric),
        Some(Value::Bool(_)) => cells
            .iter()
            .enumerate()
            .map(|(row, v)| match v {
                Value::Null => Ok(None),
                Value::Bool(b) => Ok(Some(*b)),
                _ => Err(mixed(row)),
            })
            .collect::<Result<_, _>>()
            .map(Column::Boolean),
        Some(Value::String(_)) => cells
            .iter()
            .enumerate()
            .map(|(row, v)| match v {
                Value::Null => Ok(None),
                Value::String(s) => Ok(Some(s.clone())),
                _ => Err(mixed(row)),
            })
            .collect::<Result<_, _>>()
            .map(Column::Categorical),
        Some(_) => {
            let row = cells.iter().position(|v| !v.is_null()).unwrap_or(0);
            Err(mixed(row))
        }
    }
}
