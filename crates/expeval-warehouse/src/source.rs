use std::{
    io::{self, Write as _},
    process::{Command, ExitStatus, Stdio},
};

use expeval_table::{ObservationTable, TableError};
use serde_json::Value;

/// Something that answers queries with a table.
pub trait QuerySource {
    fn run_query(&self, query: &str) -> Result<ObservationTable, QueryError>;
}

impl<S> QuerySource for &S
where
    S: QuerySource + ?Sized,
{
    fn run_query(&self, query: &str) -> Result<ObservationTable, QueryError> {
        (**self).run_query(query)
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum QueryError {
    #[display("failed to start '{program}': {source}")]
    Spawn { program: String, source: io::Error },
    #[display("failed to send query to '{program}': {source}")]
    Stdin { program: String, source: io::Error },
    #[display("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[display("'{program}' did not print a JSON array of records: {source}")]
    InvalidJson {
        program: String,
        source: serde_json::Error,
    },
    #[display("'{program}' returned records that do not form a table: {source}")]
    InvalidRecords { program: String, source: TableError },
    /// Failure reported by a source that is not backed by a process.
    #[display("{message}")]
    Other { message: String },
}

/// Runs an external warehouse client for every query.
///
/// The query is written to the child's standard input; the child must print
/// a JSON array of row objects on standard output, as
/// `bq query --format=json --nouse_legacy_sql` does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSource {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSource {
    pub fn new<P, I, A>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl QuerySource for CommandSource {
    fn run_query(&self, query: &str) -> Result<ObservationTable, QueryError> {
        let program = || self.program.clone();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| QueryError::Spawn {
                program: program(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(query.as_bytes())
                .map_err(|source| QueryError::Stdin {
                    program: program(),
                    source,
                })?;
        }
        let output = child.wait_with_output().map_err(|source| QueryError::Spawn {
            program: program(),
            source,
        })?;
        if !output.status.success() {
            return Err(QueryError::Failed {
                program: program(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let records: Vec<Value> =
            serde_json::from_slice(&output.stdout).map_err(|source| QueryError::InvalidJson {
                program: program(),
                source,
            })?;
        tracing::debug!(program = %self.program, rows = records.len(), "query returned");
        ObservationTable::from_records(&records).map_err(|source| QueryError::InvalidRecords {
            program: program(),
            source,
        })
    }
}
