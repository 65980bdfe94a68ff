use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single typed column of an [`ObservationTable`](crate::ObservationTable).
///
/// Every cell is optional. `None` marks a missing value; in numeric columns a
/// `NaN` cell is treated as missing as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Categorical(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ColumnKind {
    #[display("numeric")]
    Numeric,
    #[display("boolean")]
    Boolean,
    #[display("categorical")]
    Categorical,
    #[display("date")]
    Date,
}

impl Column {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Boolean(values) => values.len(),
            Column::Categorical(values) => values.len(),
            Column::Date(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Numeric(_) => ColumnKind::Numeric,
            Column::Boolean(_) => ColumnKind::Boolean,
            Column::Categorical(_) => ColumnKind::Categorical,
            Column::Date(_) => ColumnKind::Date,
        }
    }

    #[must_use]
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            Column::Numeric(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_boolean(&self) -> Option<&[Option<bool>]> {
        match self {
            Column::Boolean(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_categorical(&self) -> Option<&[Option<String>]> {
        match self {
            Column::Categorical(values) => Some(values),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<&[Option<NaiveDate>]> {
        match self {
            Column::Date(values) => Some(values),
            _ => None,
        }
    }

    /// Returns `true` if the cell at `row` is missing.
    #[must_use]
    pub fn is_missing(&self, row: usize) -> bool {
        self.key(row).is_none()
    }

    /// Returns an orderable key for the cell at `row`, `None` if missing.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    #[must_use]
    pub fn key(&self, row: usize) -> Option<CellKey> {
        match self {
            Column::Numeric(values) => values[row]
                .filter(|v| !v.is_nan())
                .map(CellKey::Number),
            Column::Boolean(values) => values[row].map(CellKey::Boolean),
            Column::Categorical(values) => values[row].clone().map(CellKey::Text),
            Column::Date(values) => values[row].map(CellKey::Date),
        }
    }

    /// Builds a new column from the cells at `indices`, in that order.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn take(&self, indices: &[usize]) -> Self {
        fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| values[i].clone()).collect()
        }
        match self {
            Column::Numeric(values) => Column::Numeric(pick(values, indices)),
            Column::Boolean(values) => Column::Boolean(pick(values, indices)),
            Column::Categorical(values) => Column::Categorical(pick(values, indices)),
            Column::Date(values) => Column::Date(pick(values, indices)),
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Column::Numeric(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<f64>>> for Column {
    fn from(values: Vec<Option<f64>>) -> Self {
        Column::Numeric(values)
    }
}

impl From<Vec<bool>> for Column {
    fn from(values: Vec<bool>) -> Self {
        Column::Boolean(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        Column::Categorical(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Column::Categorical(values.into_iter().map(|v| Some(v.to_owned())).collect())
    }
}

impl From<Vec<NaiveDate>> for Column {
    fn from(values: Vec<NaiveDate>) -> Self {
        Column::Date(values.into_iter().map(Some).collect())
    }
}

/// A non-missing cell value with a total order.
///
/// Numbers are compared with [`f64::total_cmp`]. Keys of different kinds are
/// ordered by kind.
#[derive(Debug, Clone)]
pub enum CellKey {
    Number(f64),
    Boolean(bool),
    Text(String),
    Date(NaiveDate),
}

impl CellKey {
    fn rank(&self) -> u8 {
        match self {
            CellKey::Number(_) => 0,
            CellKey::Boolean(_) => 1,
            CellKey::Text(_) => 2,
            CellKey::Date(_) => 3,
        }
    }
}

impl PartialEq for CellKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellKey {}

impl PartialOrd for CellKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CellKey::Number(a), CellKey::Number(b)) => a.total_cmp(b),
            (CellKey::Boolean(a), CellKey::Boolean(b)) => a.cmp(b),
            (CellKey::Text(a), CellKey::Text(b)) => a.cmp(b),
            (CellKey::Date(a), CellKey::Date(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_is_missing() {
        let column = Column::Numeric(vec![Some(1.0), None, Some(f64::NAN)]);
        assert!(!column.is_missing(0));
        assert!(column.is_missing(1));
        assert!(column.is_missing(2));
    }

    #[test]
    fn test_take_reorders() {
        let column = Column::from(vec!["a", "b", "c"]);
        let taken = column.take(&[2, 0, 2]);
        assert_eq!(taken, Column::from(vec!["c", "a", "c"]));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(Column::from(vec![true]).kind().to_string(), "boolean");
        assert_eq!(Column::from(vec![1.0]).kind().to_string(), "numeric");
    }

    #[test]
    fn test_key_order() {
        let mut keys = vec![
            CellKey::Number(3.0),
            CellKey::Number(-1.0),
            CellKey::Text("b".to_owned()),
            CellKey::Text("a".to_owned()),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                CellKey::Number(-1.0),
                CellKey::Number(3.0),
                CellKey::Text("a".to_owned()),
                CellKey::Text("b".to_owned()),
            ]
        );
    }

    #[test]
    fn test_serde_representation() {
        let column = Column::Numeric(vec![Some(1.5), None]);
        let json = serde_json::to_value(&column).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "numeric", "values": [1.5, null] })
        );
        let back: Column = serde_json::from_value(json).unwrap();
        assert_eq!(back, column);
    }
}
