use std::{fs, path::PathBuf};

use anyhow::{Context as _, bail};
use expeval_warehouse::{CachedQuery, CommandSource, DEFAULT_DATE_FORMAT};

use crate::util::Output;

const DEFAULT_CLIENT: &str = "bq";
const DEFAULT_CLIENT_ARGS: [&str; 3] = ["query", "--format=json", "--nouse_legacy_sql"];

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct FetchArg {
    /// Query text
    #[arg(long, conflicts_with = "query_file")]
    query: Option<String>,
    /// File containing the query text
    #[arg(long)]
    query_file: Option<PathBuf>,
    /// Cache file (.json); read if it exists, written otherwise
    #[arg(long)]
    cache: Option<PathBuf>,
    /// Warehouse client program; receives the query on stdin and prints JSON records
    #[arg(long, default_value = DEFAULT_CLIENT)]
    client: String,
    /// Argument passed to the client (repeatable); defaults to a BigQuery JSON query
    #[arg(long = "client-arg", allow_hyphen_values = true)]
    client_args: Vec<String>,
    /// Text column to convert to dates (repeatable)
    #[arg(long = "convert-date")]
    convert_dates: Vec<String>,
    /// Format of the converted date columns
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    date_format: String,
    /// Text column to convert to numbers (repeatable)
    #[arg(long = "convert-numeric")]
    convert_numeric: Vec<String>,
    /// Text column to convert to booleans (repeatable)
    #[arg(long = "convert-bool")]
    convert_booleans: Vec<String>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &FetchArg) -> anyhow::Result<()> {
    let query = match (&arg.query, &arg.query_file) {
        (Some(query), _) => query.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read query file: {}", path.display()))?,
        (None, None) => bail!("either --query or --query-file is required"),
    };

    let source = if arg.client_args.is_empty() {
        CommandSource::new(arg.client.as_str(), DEFAULT_CLIENT_ARGS)
    } else {
        CommandSource::new(arg.client.as_str(), arg.client_args.iter().map(String::as_str))
    };
    let mut cached = CachedQuery::new(source)
        .with_convert_dates(arg.convert_dates.iter().cloned())
        .with_convert_numeric(arg.convert_numeric.iter().cloned())
        .with_convert_booleans(arg.convert_booleans.iter().cloned());
    cached.date_format.clone_from(&arg.date_format);

    let table = cached
        .fetch(&query, arg.cache.as_deref())
        .context("Failed to fetch data")?;
    Output::save_json(&table, arg.output.clone())
}
