//! Command handlers for the inventory CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod ingest;
mod summarize;
mod tables;

use crate::logging::{Component, Logging};
use crate::Result;
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info};

pub use ingest::ingest;
pub use summarize::summarize;
pub use tables::tables;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data describing what happened.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Runs `command` under `component`'s log stream and prints its outcome to the same stream.
pub async fn run_logged<T, F>(logging: &Logging, component: Component, command: F) -> Result<()>
where
    T: Serialize + Clone + Debug,
    F: Future<Output = Result<Out<T>>>,
{
    let dispatch = logging.dispatch(component)?;
    async move { command.await.map(|out| out.print()) }
        .with_subscriber(dispatch)
        .await
}

/// Returns `singular` or `plural` depending on `count`.
fn plural<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 {
        singular
    } else {
        plural
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_run_logged_writes_outcome_to_component_log() {
        let env = TestEnv::new().await;
        env.write_data_file("sales.csv", "VendorNo,Brand\n1,58\n");

        run_logged(&env.logging(), Component::IngestionDb, ingest(env.config()))
            .await
            .unwrap();

        let log = env.read_log(Component::IngestionDb);
        assert!(log.contains("Ingested 1 table into"));
        assert!(!env.logging().log_path(Component::VendorSummary).exists());
    }

    #[tokio::test]
    async fn test_run_logged_returns_command_error() {
        let env = TestEnv::new().await;

        let result = run_logged(
            &env.logging(),
            Component::VendorSummary,
            summarize(env.config()),
        )
        .await;

        assert!(result.is_err());
        let log = env.read_log(Component::VendorSummary);
        assert!(log.contains("ERROR"));
        assert!(!log.contains("Wrote"));
    }
}
