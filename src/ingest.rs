//! The Loader: reads every CSV file in a directory and writes each into the store as a table named
//! after the file.

use crate::db::Db;
use crate::model::Table;
use crate::{utils, Result};
use anyhow::Context;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

/// The file extension that marks an input file as tabular.
pub const CSV_EXTENSION: &str = "csv";

/// What happened to a single input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum FileStatus {
    /// The file was written to the store in full.
    Ingested { rows: usize, columns: usize },
    /// Reading or writing the file failed. Other files are unaffected.
    Failed { error: String },
}

/// The outcome of ingesting one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    /// The file name, e.g. `sales.csv`.
    pub file: String,
    /// The table the file was (or would have been) written to.
    pub table: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileReport {
    pub fn is_ingested(&self) -> bool {
        matches!(self.status, FileStatus::Ingested { .. })
    }
}

/// The outcome of a whole ingestion run. An empty `files` list means no CSV files were found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub started_at: DateTime<Local>,
    pub elapsed_secs: f64,
    pub files: Vec<FileReport>,
}

impl IngestReport {
    pub fn ingested(&self) -> usize {
        self.files.iter().filter(|f| f.is_ingested()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.ingested()
    }
}

/// Loads every CSV file directly inside `data_dir` into `db`.
///
/// Each file becomes a table named after the file stem, replacing any previous table of that
/// name. A file that cannot be read, parsed or written is logged and recorded as failed; the rest
/// of the batch carries on. Only a problem listing `data_dir` itself is returned as an error.
pub(crate) async fn load_raw_data(db: &Db, data_dir: &Path) -> Result<IngestReport> {
    info!("Starting data ingestion process...");
    let started_at = Local::now();
    let start = Instant::now();

    let data_files: Vec<_> = utils::list_files(data_dir)
        .await
        .context("Unable to list the data directory")?
        .into_iter()
        .filter(|path| is_csv(path))
        .collect();

    if data_files.is_empty() {
        warn!("No CSV files found in '{}'.", data_dir.display());
        return Ok(IngestReport {
            started_at,
            elapsed_secs: start.elapsed().as_secs_f64(),
            files: Vec::new(),
        });
    }

    let mut files = Vec::with_capacity(data_files.len());
    for path in data_files {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let table = table_name(&path);

        let status = match ingest_file(db, &path, &table).await {
            Ok(ingested) => ingested,
            Err(e) => {
                error!("Error processing file {file}: {e:#}");
                FileStatus::Failed {
                    error: format!("{e:#}"),
                }
            }
        };
        files.push(FileReport {
            file,
            table,
            status,
        });
    }

    let elapsed = start.elapsed();
    info!("-------------Ingestion Complete------------");
    info!("Total Time Taken: {:.2} minutes", elapsed.as_secs_f64() / 60.0);

    Ok(IngestReport {
        started_at,
        elapsed_secs: elapsed.as_secs_f64(),
        files,
    })
}

async fn ingest_file(db: &Db, path: &Path, table_name: &str) -> Result<FileStatus> {
    let data = utils::read_bytes(path).await?;
    let table = Table::from_csv(table_name, &data)?;
    info!(
        "Ingesting {} into the database...",
        path.file_name().unwrap_or_default().to_string_lossy()
    );
    db.replace_table(&table)
        .await
        .with_context(|| format!("Failed to ingest table '{table_name}'"))?;
    Ok(FileStatus::Ingested {
        rows: table.len(),
        columns: table.columns().len(),
    })
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(CSV_EXTENSION))
        .unwrap_or(false)
}

/// The table name for a file: its name without the extension.
fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
