use crate::commands::{plural, Out};
use crate::ingest::{load_raw_data, IngestReport};
use crate::{Config, Result};

/// Loads every CSV file in the configured data directory into the store, one table per file.
///
/// Files that fail are reported in the structure and the message but do not fail the command.
pub async fn ingest(config: Config) -> Result<Out<IngestReport>> {
    let report = load_raw_data(config.db(), config.data_dir()).await?;

    let message = if report.files.is_empty() {
        format!("No CSV files found in {}", config.data_dir().display())
    } else {
        let ingested = report.ingested();
        let failed = report.failed();
        let mut message = format!(
            "Ingested {ingested} {} into {} in {:.2}s",
            plural(ingested, "table", "tables"),
            config.db_path().display(),
            report.elapsed_secs
        );
        if failed > 0 {
            message.push_str(&format!(
                ", {failed} {} failed",
                plural(failed, "file", "files")
            ));
        }
        message
    };
    Ok(Out::new(message, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_ingest_message_counts_tables_and_failures() {
        let env = TestEnv::new().await;
        env.write_data_file("sales.csv", "VendorNo,Brand\n1,58\n");
        env.write_data_file("broken.csv", "a\n1,2\n");

        let out = ingest(env.config()).await.unwrap();

        assert!(out.message().starts_with("Ingested 1 table into"));
        assert!(out.message().ends_with(", 1 file failed"));
        assert_eq!(out.structure().unwrap().files.len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_empty_directory() {
        let env = TestEnv::new().await;

        let out = ingest(env.config()).await.unwrap();

        assert!(out.message().starts_with("No CSV files found"));
        assert!(out.structure().unwrap().files.is_empty());
    }
}
