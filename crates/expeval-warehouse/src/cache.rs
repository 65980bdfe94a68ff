use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use expeval_table::{ObservationTable, TableError};

use crate::source::{QueryError, QuerySource};

/// Format used to parse date columns returned as text.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

const CACHE_EXTENSION: &str = "json";

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum FetchError {
    #[display("cache path '{}' must end in .{CACHE_EXTENSION}", path.display())]
    InvalidCachePath { path: PathBuf },
    #[display("query failed: {source}")]
    Query { source: QueryError },
    #[display("failed to convert column types: {source}")]
    ConvertColumns { source: TableError },
    #[display("failed to read cache file '{}': {source}", path.display())]
    ReadCache { path: PathBuf, source: io::Error },
    #[display("failed to parse cache file '{}': {source}", path.display())]
    ParseCache {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("failed to write cache file '{}': {source}", path.display())]
    WriteCache { path: PathBuf, source: io::Error },
    #[display("failed to serialize cache file '{}': {source}", path.display())]
    SerializeCache {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<QueryError> for FetchError {
    fn from(source: QueryError) -> Self {
        Self::Query { source }
    }
}

/// Read-through file cache in front of a [`QuerySource`].
///
/// # Examples
///
/// ```
/// use expeval_table::ObservationTable;
/// use expeval_warehouse::{CachedQuery, QueryError, QuerySource};
///
/// struct Fixed;
///
/// impl QuerySource for Fixed {
///     fn run_query(&self, _query: &str) -> Result<ObservationTable, QueryError> {
///         Ok(ObservationTable::new().with_column("y", vec![1.0, 2.0]).unwrap())
///     }
/// }
///
/// let table = CachedQuery::new(Fixed).fetch("SELECT y FROM t", None)?;
/// assert_eq!(table.num_rows(), 2);
/// # Ok::<(), expeval_warehouse::FetchError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CachedQuery<S> {
    pub source: S,
    /// Text columns to parse as dates after querying.
    pub convert_dates: Vec<String>,
    /// `chrono` format of the columns in `convert_dates`.
    pub date_format: String,
    /// Text columns to parse as numbers after querying.
    pub convert_numeric: Vec<String>,
    /// Text columns to parse as booleans after querying.
    pub convert_booleans: Vec<String>,
}

impl<S> CachedQuery<S>
where
    S: QuerySource,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            convert_dates: vec![],
            date_format: DEFAULT_DATE_FORMAT.to_owned(),
            convert_numeric: vec![],
            convert_booleans: vec![],
        }
    }

    #[must_use]
    pub fn with_convert_dates<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.convert_dates = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_convert_numeric<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.convert_numeric = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_convert_booleans<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        self.convert_booleans = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the result of `query`, going through the cache at `cache_path`.
    ///
    /// - Without a cache path the source is always queried.
    /// - If the cache file exists it is returned as is and the source is not
    ///   called.
    /// - Otherwise the source is queried and the result, after converting the
    ///   configured text columns to dates, numbers and booleans, is written to
    ///   the cache path.
    ///
    /// The cache path must have a `.json` extension; this is checked before
    /// anything else.
    pub fn fetch(
        &self,
        query: &str,
        cache_path: Option<&Path>,
    ) -> Result<ObservationTable, FetchError> {
        if let Some(path) = cache_path {
            if path.extension().is_none_or(|ext| ext != CACHE_EXTENSION) {
                return Err(FetchError::InvalidCachePath {
                    path: path.to_owned(),
                });
            }
            if path.is_file() {
                tracing::info!(path = %path.display(), "reading data from cache");
                return read_cache(path);
            }
        }

        tracing::info!("querying data source");
        let mut table = self.source.run_query(query)?;
        self.convert_columns(&mut table)
            .map_err(|source| FetchError::ConvertColumns { source })?;

        if let Some(path) = cache_path {
            tracing::info!(path = %path.display(), rows = table.num_rows(), "writing data to cache");
            write_cache(path, &table)?;
        }
        Ok(table)
    }
}

impl<S> CachedQuery<S> {
    fn convert_columns(&self, table: &mut ObservationTable) -> Result<(), TableError> {
        for column in &self.convert_dates {
            table.parse_dates(column, &self.date_format)?;
        }
        for column in &self.convert_numeric {
            table.parse_numeric(column)?;
        }
        for column in &self.convert_booleans {
            table.parse_booleans(column)?;
        }
        Ok(())
    }
}

fn read_cache(path: &Path) -> Result<ObservationTable, FetchError> {
    let file = File::open(path).map_err(|source| FetchError::ReadCache {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| FetchError::ParseCache {
        path: path.to_owned(),
        source,
    })
}

/// Writes to a sibling `.partial` file, then renames it into place.
fn write_cache(path: &Path, table: &ObservationTable) -> Result<(), FetchError> {
    let write_error = |source| FetchError::WriteCache {
        path: path.to_owned(),
        source,
    };
    let partial = path.with_extension("json.partial");
    let file = File::create(&partial).map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, table).map_err(|source| FetchError::SerializeCache {
        path: path.to_owned(),
        source,
    })?;
    writer.flush().map_err(write_error)?;
    drop(writer);
    fs::rename(&partial, path).map_err(write_error)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use expeval_table::{Column, ColumnKind};
    use tempfile::TempDir;

    use super::*;

    /// Source that counts its calls and returns a small table with a text date.
    #[derive(Default)]
    struct CountingSource {
        calls: Cell<usize>,
    }

    impl QuerySource for CountingSource {
        fn run_query(&self, _query: &str) -> Result<ObservationTable, QueryError> {
            self.calls.set(self.calls.get() + 1);
            Ok(ObservationTable::new()
                .with_column("id", vec!["a", "b"])
                .unwrap()
                .with_column("day", vec!["2023-01-01", "2023-01-02"])
                .unwrap()
                .with_column("y", vec![Some(1.0), None])
                .unwrap())
        }
    }

    struct FailingSource;

    impl QuerySource for FailingSource {
        fn run_query(&self, _query: &str) -> Result<ObservationTable, QueryError> {
            Err(QueryError::Other {
                message: "warehouse unavailable".to_owned(),
            })
        }
    }

    #[test]
    fn test_no_cache_always_queries() {
        let cached = CachedQuery::new(CountingSource::default());
        cached.fetch("q", None).unwrap();
        cached.fetch("q", None).unwrap();
        assert_eq!(cached.source.calls.get(), 2);
    }

    #[test]
    fn test_second_fetch_reads_cache() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("result.json");
        let cached = CachedQuery::new(CountingSource::default());

        let first = cached.fetch("q", Some(path.as_path())).unwrap();
        assert!(path.is_file());
        let second = cached.fetch("q", Some(path.as_path())).unwrap();
        assert_eq!(cached.source.calls.get(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_existing_cache_skips_source() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seeded.json");
        let seeded = ObservationTable::new()
            .with_column("y", vec![3.0])
            .unwrap();
        fs::write(&path, serde_json::to_string(&seeded).unwrap()).unwrap();

        let table = CachedQuery::new(FailingSource)
            .fetch("q", Some(path.as_path()))
            .unwrap();
        assert_eq!(table, seeded);
    }

    #[test]
    fn test_invalid_cache_path() {
        let cached = CachedQuery::new(CountingSource::default());
        for name in ["result.parquet", "result", "result.json.bak"] {
            assert!(matches!(
                cached.fetch("q", Some(Path::new(name))),
                Err(FetchError::InvalidCachePath { .. })
            ));
        }
        assert_eq!(cached.source.calls.get(), 0);
    }

    #[test]
    fn test_convert_dates_before_caching() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("dates.json");
        let cached = CachedQuery::new(CountingSource::default()).with_convert_dates(["day"]);

        let table = cached.fetch("q", Some(path.as_path())).unwrap();
        assert_eq!(table.column("day").map(Column::kind), Some(ColumnKind::Date));

        let reread = cached.fetch("q", Some(path.as_path())).unwrap();
        assert_eq!(reread.column("day").map(Column::kind), Some(ColumnKind::Date));
        assert!(reread.column("y").unwrap().is_missing(1));
    }

    #[cfg(unix)]
    #[test]
    fn test_quoted_client_output_can_be_evaluated() {
        use expeval_evaluator::ExperimentEvaluator;

        use crate::CommandSource;

        // Clients such as `bq --format=json` quote every cell
        let records = (0..8)
            .map(|i| {
                let treated = i >= 4;
                format!(
                    r#"{{"assignments": "{}", "is_treated": "{treated}", "assignments_freq": "1", "y": "{}"}}"#,
                    if treated { "treatment" } else { "control" },
                    i % 4 + if treated { 3 } else { 1 },
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let script = format!("cat > /dev/null; echo '[{records}]'");
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("quoted.json");
        let cached = CachedQuery::new(CommandSource::new("sh", ["-c", script.as_str()]))
            .with_convert_numeric(["y", "assignments_freq"])
            .with_convert_booleans(["is_treated"]);

        let evaluator = ExperimentEvaluator::default();
        for _ in 0..2 {
            // Second round reads the converted table back from the cache
            let table = cached.fetch("q", Some(path.as_path())).unwrap();
            assert_eq!(table.column("y").map(Column::kind), Some(ColumnKind::Numeric));
            let fit = evaluator.fit_weighted_least_squares(&table, "y").unwrap();
            assert!((fit.estimate - 2.0).abs() < 1e-12);
            let welch = evaluator.welch_t_test(&table, "y").unwrap();
            assert!(welch > 0.0 && welch < 1.0);
        }
    }

    #[test]
    fn test_unconvertible_column() {
        let cached = CachedQuery::new(CountingSource::default()).with_convert_numeric(["id"]);
        assert!(matches!(
            cached.fetch("q", None),
            Err(FetchError::ConvertColumns {
                source: TableError::InvalidText { .. }
            })
        ));
    }

    #[test]
    fn test_query_errors_are_not_cached() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("never.json");
        assert!(matches!(
            CachedQuery::new(FailingSource).fetch("q", Some(path.as_path())),
            Err(FetchError::Query { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_cache() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("corrupt.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            CachedQuery::new(CountingSource::default()).fetch("q", Some(path.as_path())),
            Err(FetchError::ParseCache { .. })
        ));
    }
}
