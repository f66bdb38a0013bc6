use crate::commands::{plural, Out};
use crate::summary::{self, SummaryReport};
use crate::{Config, Result};

/// Builds the vendor summary table from the ledgers already in the store.
///
/// Fails if the summary cannot be aggregated. A cleaning failure still succeeds, with the partially
/// cleaned table written and the failure described in the message.
pub async fn summarize(config: Config) -> Result<Out<SummaryReport>> {
    let report = summary::build(config.db()).await?;
    let rows = plural(report.rows, "row", "rows");
    let message = match &report.cleaning_error {
        None => format!("Wrote {} {rows} to '{}'", report.rows, report.table),
        Some(e) => format!(
            "Wrote {} partially cleaned {rows} to '{}' ({e})",
            report.rows, report.table
        ),
    };
    Ok(Out::new(message, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ingest;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_ingest_then_summarize() {
        let env = TestEnv::new().await;
        env.write_data_file("purchase_prices.csv", "Brand,Price,Volume\n58,12.99,750\n");
        env.write_data_file(
            "purchases.csv",
            "VendorNumber,VendorName,Brand,Description,PurchasePrice,Quantity,Dollars\n\
             1,Acme Co,58,Sake,10,10,100\n",
        );
        env.write_data_file(
            "sales.csv",
            "VendorNo,Brand,SalesQuantity,SalesDollars,SalesPrice,ExciseTax\n\
             1,58,8,104,12.99,0.5\n",
        );
        env.write_data_file("vendor_invoice.csv", "VendorNumber,Freight\n1,2.25\n");

        ingest(env.config()).await.unwrap();
        let out = summarize(env.config()).await.unwrap();

        assert_eq!(out.message(), "Wrote 1 row to 'vendor_sales_summary'");
        let report = out.structure().unwrap();
        assert!(report.complete);
        assert!(report.columns.contains(&"SalesToPurchaseRatio".to_string()));
    }

    #[tokio::test]
    async fn test_summarize_empty_store_fails() {
        let env = TestEnv::new().await;
        assert!(summarize(env.config()).await.is_err());
    }
}
