pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
mod ingest;
pub mod logging;
pub mod model;
mod summary;
mod utils;

#[cfg(test)]
mod test;

pub use config::Config;
pub use db::TableInfo;
pub use error::Error;
pub use error::Result;
pub use ingest::{FileReport, FileStatus, IngestReport};
pub use summary::{clean_data, Cleaned, SummaryReport};
