//! Per-component log streams.
//!
//! The Loader and the Summarizer each append to their own file under the logs directory. Rather
//! than installing a process-wide subscriber for each, a [`Logging`] value builds a
//! [`tracing::Dispatch`] for a component, and the caller attaches it to the component's future
//! with [`tracing::instrument::WithSubscriber`].

use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Dispatch;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Matches the `asctime` layout of a typical Python log line, e.g. `2025-06-01 09:30:12,345`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// The components that own a log stream.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// CSV ingestion into the store.
    IngestionDb,
    /// Building the vendor summary table.
    VendorSummary,
}

serde_plain::derive_display_from_serialize!(Component);
serde_plain::derive_fromstr_from_deserialize!(Component);

impl Component {
    /// The name of the file this component appends to, e.g. `ingestion_db.log`.
    pub fn log_file_name(self) -> String {
        format!("{self}.log")
    }
}

/// Logging settings shared by all components of a run.
#[derive(Debug, Clone)]
pub struct Logging {
    dir: PathBuf,
    level: LevelFilter,
}

impl Logging {
    pub fn new(dir: impl Into<PathBuf>, level: LevelFilter) -> Self {
        Self {
            dir: dir.into(),
            level,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Path of the log file for `component`.
    pub fn log_path(&self, component: Component) -> PathBuf {
        self.dir.join(component.log_file_name())
    }

    /// Builds a subscriber that writes `component`'s events both to its log file (appending) and
    /// to stderr.
    pub fn dispatch(&self, component: Component) -> Result<Dispatch> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Unable to create directory {}", self.dir.display()))?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(component.log_file_name())
            .build(&self.dir)
            .with_context(|| format!("Unable to open {}", self.log_path(component).display()))?;

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_timer(ChronoLocal::new(TIMESTAMP_FORMAT.to_string()))
            .with_writer(appender);

        let console_layer = fmt::layer().with_writer(std::io::stderr);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(self.level))
            .with(file_layer)
            .with(console_layer);

        Ok(Dispatch::new(subscriber))
    }
}

/// `RUST_LOG` wins when set; otherwise `level` applies to this crate and the binary only.
pub fn env_filter(level: LevelFilter) -> EnvFilter {
    match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(format!(
            "{}={},inventory={}",
            env!("CARGO_CRATE_NAME"),
            level,
            level
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing::instrument::WithSubscriber;
    use tracing::{info, warn};

    #[test]
    fn test_component_file_names() {
        assert_eq!(Component::IngestionDb.log_file_name(), "ingestion_db.log");
        assert_eq!(
            Component::VendorSummary.log_file_name(),
            "vendor_summary.log"
        );
        assert_eq!(
            "vendor_summary".parse::<Component>().unwrap(),
            Component::VendorSummary
        );
    }

    #[tokio::test]
    async fn test_dispatch_appends_to_component_file() {
        let dir = TempDir::new().unwrap();
        let logging = Logging::new(dir.path().join("logs"), LevelFilter::INFO);

        for message in ["first run", "second run"] {
            let dispatch = logging.dispatch(Component::IngestionDb).unwrap();
            async move {
                info!("{message}");
                warn!("careful");
            }
            .with_subscriber(dispatch)
            .await;
        }

        let content = std::fs::read_to_string(logging.log_path(Component::IngestionDb)).unwrap();
        assert!(content.contains("INFO"));
        assert!(content.contains("first run"));
        assert!(content.contains("second run"));
        assert!(content.contains("WARN"));
        assert!(!logging.log_path(Component::VendorSummary).exists());
    }

    #[test]
    fn test_dispatch_fails_when_log_file_cannot_be_opened() {
        let dir = TempDir::new().unwrap();
        let logging = Logging::new(dir.path(), LevelFilter::INFO);
        std::fs::create_dir(logging.log_path(Component::VendorSummary)).unwrap();

        let err = logging.dispatch(Component::VendorSummary).unwrap_err();
        assert!(format!("{err:#}").contains("vendor_summary.log"));
        assert!(logging.dispatch(Component::IngestionDb).is_ok());
    }
}
