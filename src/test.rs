//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::db::Db;
use crate::logging::{Component, Logging};
use crate::model::Table;
use crate::Config;
use tempfile::TempDir;
use tracing_subscriber::filter::LevelFilter;

/// Test environment that sets up a home directory with its data and logs directories and an
/// empty store. Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// Creates a test environment with a fresh home directory and database.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("inventory");
        let config = Config::load(&root, None).await.unwrap();
        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    pub fn db(&self) -> &Db {
        self.config.db()
    }

    /// Writes `contents` to `name` inside the data directory.
    pub fn write_data_file(&self, name: &str, contents: &str) {
        std::fs::write(self.config.data_dir().join(name), contents).unwrap();
    }

    /// Parses `csv` and stores it as table `name`, bypassing the data directory.
    pub async fn load_table(&self, name: &str, csv: &str) {
        let table = Table::from_csv(name, csv.as_bytes()).unwrap();
        self.db().replace_table(&table).await.unwrap();
    }

    /// Logging into this environment's logs directory at `INFO`.
    pub fn logging(&self) -> Logging {
        Logging::new(self.config.logs_dir(), LevelFilter::INFO)
    }

    /// Contents of `component`'s log file, or an empty string if nothing was logged.
    pub fn read_log(&self, component: Component) -> String {
        std::fs::read_to_string(self.logging().log_path(component)).unwrap_or_default()
    }
}
