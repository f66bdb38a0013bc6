//! Lists the tables in the store.

use crate::commands::{plural, Out};
use crate::db::TableInfo;
use crate::{Config, Result};
use anyhow::Context;

/// Returns the name, columns and row count of every table in the store.
pub async fn tables(config: Config) -> Result<Out<Vec<TableInfo>>> {
    let infos = config
        .db()
        .table_infos()
        .await
        .context("Unable to read the store's tables")?;
    if infos.is_empty() {
        return Ok(format!("No tables in {}", config.db_path().display()).into());
    }

    let mut message = format!(
        "{} {} in {}",
        infos.len(),
        plural(infos.len(), "table", "tables"),
        config.db_path().display()
    );
    for info in &infos {
        message.push_str(&format!(
            "\n  {} ({} {}, {} {})",
            info.name,
            info.row_count,
            plural(info.row_count as usize, "row", "rows"),
            info.columns.len(),
            plural(info.columns.len(), "column", "columns"),
        ));
    }
    Ok(Out::new(message, infos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_tables_empty_store() {
        let env = TestEnv::new().await;
        let out = tables(env.config()).await.unwrap();
        assert!(out.message().starts_with("No tables"));
        assert!(out.structure().is_none());
    }

    #[tokio::test]
    async fn test_tables_lists_rows_and_columns() {
        let env = TestEnv::new().await;
        env.load_table("sales", "VendorNo,Brand\n1,58\n2,60\n").await;
        env.load_table("vendor_invoice", "VendorNumber,Freight\n1,2.5\n")
            .await;

        let out = tables(env.config()).await.unwrap();

        assert!(out.message().contains("sales (2 rows, 2 columns)"));
        assert!(out.message().contains("vendor_invoice (1 row, 2 columns)"));
        assert_eq!(out.structure().unwrap().len(), 2);
    }
}
