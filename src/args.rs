//! These structs provide the CLI interface for the inventory CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

/// inventory: Load inventory ledgers from CSV and build a vendor sales summary.
///
/// Run `inventory ingest` to load every CSV file in the data directory into the SQLite store, one
/// table per file. Then run `inventory summarize` to aggregate the `purchases`,
/// `purchase_prices`, `sales` and `vendor_invoice` tables into `vendor_sales_summary`.
/// `inventory run` does both.
///
/// Each step appends to its own log file in the logs directory.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load every CSV file in the data directory into the store.
    ///
    /// Each file becomes a table named after the file without its extension. An existing table of
    /// that name is replaced. A file that fails to load is logged and skipped.
    Ingest(IngestArgs),
    /// Build the `vendor_sales_summary` table from the ledgers in the store.
    Summarize,
    /// Run `ingest` and then `summarize`.
    Run(IngestArgs),
    /// List the tables in the store with their row and column counts.
    Tables,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory that holds `data/`, `logs/` and `inventory.db`. Defaults to the current
    /// directory.
    #[arg(long, env = "INVENTORY_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// Args for the `inventory ingest` and `inventory run` commands.
#[derive(Debug, Default, Parser, Clone)]
pub struct IngestArgs {
    /// Read CSV files from this directory instead of `$INVENTORY_HOME/data`.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl IngestArgs {
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(PathBuf::from("."))
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["inventory", "summarize"]).unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::INFO);
        assert!(matches!(args.command(), Command::Summarize));
    }

    #[test]
    fn test_parse_run_with_data_dir() {
        let args = Args::try_parse_from([
            "inventory",
            "--log-level",
            "debug",
            "--home",
            "/tmp/inv",
            "run",
            "--data-dir",
            "/tmp/csv",
        ])
        .unwrap();
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        assert_eq!(args.common().home().path(), Path::new("/tmp/inv"));
        match args.command() {
            Command::Run(ingest) => assert_eq!(ingest.data_dir(), Some(Path::new("/tmp/csv"))),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_command() {
        assert!(Args::try_parse_from(["inventory", "migrate"]).is_err());
    }
}
