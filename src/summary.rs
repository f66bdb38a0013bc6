//! The Summarizer: aggregates the freight, purchase and sales ledgers into one row per
//! (vendor, brand), derives profit metrics and writes the result back to the store.

use crate::db::Db;
use crate::model::{ColumnType, Table, Value};
use crate::Result;
use anyhow::{anyhow, ensure, Context};
use tracing::{error, info};

/// Freight ledger: `VendorNumber`, `Freight`.
pub const VENDOR_INVOICE: &str = "vendor_invoice";
/// Purchase ledger: one row per purchase order line.
pub const PURCHASES: &str = "purchases";
/// Price list joined to purchases on `Brand`.
pub const PURCHASE_PRICES: &str = "purchase_prices";
/// Sales ledger: `VendorNo`, `Brand` and the sales amounts.
pub const SALES: &str = "sales";
/// The derived table.
pub const VENDOR_SALES_SUMMARY: &str = "vendor_sales_summary";

/// Tables read by [`SUMMARY_SQL`].
const SOURCE_TABLES: &[&str] = &[VENDOR_INVOICE, PURCHASES, PURCHASE_PRICES, SALES];

/// Number of rows logged when previewing a table.
const PREVIEW_ROWS: usize = 5;

/// Result columns of [`SUMMARY_SQL`], in select order.
pub const SUMMARY_COLUMNS: &[&str] = &[
    "VendorNumber",
    "VendorName",
    "Brand",
    "Description",
    "PurchasePrice",
    "ActualPrice",
    "Volume",
    "TotalPurchaseQuantity",
    "TotalPurchaseDollars",
    "TotalSalesQuantity",
    "TotalSalesDollars",
    "TotalSalesPrice",
    "TotalExciseTax",
    "FreightCost",
];

/// Purchases are aggregated per (vendor, brand, description, prices, volume) before being joined
/// to per-(vendor, brand) sales and per-vendor freight.
const SUMMARY_SQL: &str = r#"
WITH FreightSummary AS (
    SELECT
        VendorNumber,
        SUM(Freight) AS FreightCost
    FROM vendor_invoice
    GROUP BY VendorNumber
),

PurchaseSummary AS (
    SELECT
        p.VendorNumber,
        p.VendorName,
        p.Brand,
        p.Description,
        p.PurchasePrice,
        pp.Price AS ActualPrice,
        pp.Volume,
        SUM(p.Quantity) AS TotalPurchaseQuantity,
        SUM(p.Dollars) AS TotalPurchaseDollars
    FROM purchases p
    JOIN purchase_prices pp ON p.Brand = pp.Brand
    WHERE p.PurchasePrice > 0
    GROUP BY
        p.VendorNumber, p.VendorName, p.Brand,
        p.Description, p.PurchasePrice, pp.Price, pp.Volume
),

SalesSummary AS (
    SELECT
        VendorNo,
        Brand,
        SUM(SalesQuantity) AS TotalSalesQuantity,
        SUM(SalesDollars) AS TotalSalesDollars,
        SUM(SalesPrice) AS TotalSalesPrice,
        SUM(ExciseTax) AS TotalExciseTax
    FROM sales
    GROUP BY VendorNo, Brand
)

SELECT
    ps.VendorNumber,
    ps.VendorName,
    ps.Brand,
    ps.Description,
    ps.PurchasePrice,
    ps.ActualPrice,
    ps.Volume,
    ps.TotalPurchaseQuantity,
    ps.TotalPurchaseDollars,
    ss.TotalSalesQuantity,
    ss.TotalSalesDollars,
    ss.TotalSalesPrice,
    ss.TotalExciseTax,
    fs.FreightCost
FROM PurchaseSummary ps
LEFT JOIN SalesSummary ss
    ON ps.VendorNumber = ss.VendorNo AND ps.Brand = ss.Brand
LEFT JOIN FreightSummary fs
    ON ps.VendorNumber = fs.VendorNumber
ORDER BY ps.TotalPurchaseDollars DESC
"#;

/// The outcome of cleaning the aggregated summary.
#[derive(Debug)]
pub enum Cleaned {
    /// Every cleaning and derivation step was applied.
    Complete(Table),
    /// A step failed. `table` holds the steps applied before the failure.
    Partial { table: Table, error: anyhow::Error },
}

impl Cleaned {
    pub fn table(&self) -> &Table {
        match self {
            Cleaned::Complete(table) => table,
            Cleaned::Partial { table, .. } => table,
        }
    }

    pub fn into_table(self) -> Table {
        match self {
            Cleaned::Complete(table) => table,
            Cleaned::Partial { table, .. } => table,
        }
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Cleaned::Complete(_) => None,
            Cleaned::Partial { error, .. } => Some(error),
        }
    }
}

/// Runs the aggregation query. An empty table is a valid result (nothing was purchased); an error
/// means the summary could not be computed at all, e.g. because a source table is missing.
pub(crate) async fn create_vendor_summary(db: &Db) -> Result<Table> {
    for source in SOURCE_TABLES {
        ensure!(
            db.table_exists(source).await?,
            "Source table '{source}' does not exist"
        );
    }
    let rows = db
        .fetch_rows(SUMMARY_SQL)
        .await
        .context("Failed to generate vendor summary")?;
    let table = Table::from_rows(VENDOR_SALES_SUMMARY, SUMMARY_COLUMNS.iter().copied(), rows)?;
    info!("Vendor summary generated successfully.");
    Ok(table)
}

/// Cleans the aggregated summary and adds the derived metrics.
///
/// Steps, in order: coerce `Volume` to float, fill nulls with zero, trim `VendorName` and
/// `Description`, then add `GrossProfit`, `ProfitMargin`, `StockTurnover` and
/// `SalesToPurchaseRatio`. Division by zero yields an infinite or NaN value rather than an error.
/// If a step fails, the table is returned as it stood after the last successful step.
pub fn clean_data(mut table: Table) -> Cleaned {
    match clean_in_place(&mut table) {
        Ok(()) => {
            info!("Data cleaning completed.");
            Cleaned::Complete(table)
        }
        Err(error) => {
            error!("Error cleaning data: {error:#}");
            Cleaned::Partial { table, error }
        }
    }
}

fn clean_in_place(table: &mut Table) -> Result<()> {
    coerce_to_float(table, "Volume")?;
    fill_nulls_with_zero(table);
    trim_text(table, "VendorName")?;
    trim_text(table, "Description")?;

    let gross_profit = binary_op(table, "TotalSalesDollars", "TotalPurchaseDollars", |s, p| s - p)?;
    table.put_column("GrossProfit", ColumnType::Real, gross_profit)?;

    let profit_margin = binary_op(table, "GrossProfit", "TotalSalesDollars", |g, s| g / s * 100.0)?;
    table.put_column("ProfitMargin", ColumnType::Real, profit_margin)?;

    let stock_turnover = binary_op(
        table,
        "TotalSalesQuantity",
        "TotalPurchaseQuantity",
        |s, p| s / p,
    )?;
    table.put_column("StockTurnover", ColumnType::Real, stock_turnover)?;

    let sales_to_purchase = binary_op(
        table,
        "TotalSalesDollars",
        "TotalPurchaseDollars",
        |s, p| s / p,
    )?;
    table.put_column("SalesToPurchaseRatio", ColumnType::Real, sales_to_purchase)?;
    Ok(())
}

/// Converts every value of column `name` to `Real`. Nulls stay null. Either the whole column is
/// converted or, on the first unparseable value, nothing is.
fn coerce_to_float(table: &mut Table, name: &str) -> Result<()> {
    let c = table.require_column(name)?;
    let values = table
        .column_values(c)
        .map(|value| match value {
            Value::Null => Ok(Value::Null),
            Value::Integer(i) => Ok(Value::Real(*i as f64)),
            Value::Real(f) => Ok(Value::Real(*f)),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|_| anyhow!("Could not convert string to float in '{name}': '{s}'")),
        })
        .collect::<Result<Vec<Value>>>()?;
    table.set_column(c, ColumnType::Real, values)
}

fn fill_nulls_with_zero(table: &mut Table) {
    table.map_values(|column, value| {
        if value.is_null() {
            *value = column.column_type().zero();
        }
    });
}

fn trim_text(table: &mut Table, name: &str) -> Result<()> {
    let c = table.require_column(name)?;
    let values: Vec<Value> = table
        .column_values(c)
        .map(|value| match value {
            Value::Text(s) => Value::Text(s.trim().to_string()),
            other => other.clone(),
        })
        .collect();
    let column_type = table.columns()[c].column_type();
    table.set_column(c, column_type, values)
}

/// Computes `op(left, right)` for every row. Both columns must be numeric.
fn binary_op(
    table: &Table,
    left: &str,
    right: &str,
    op: impl Fn(f64, f64) -> f64,
) -> Result<Vec<Value>> {
    let l = table.require_column(left)?;
    let r = table.require_column(right)?;
    table
        .column_values(l)
        .zip(table.column_values(r))
        .enumerate()
        .map(|(i, (a, b))| {
            let a = numeric(a, left, i)?;
            let b = numeric(b, right, i)?;
            Ok(Value::Real(op(a, b)))
        })
        .collect()
}

fn numeric(value: &Value, column: &str, row: usize) -> Result<f64> {
    value
        .as_f64()
        .with_context(|| format!("Value '{value}' in column '{column}', row {row} is not numeric"))
}

/// Summary of a completed run, returned to the caller.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SummaryReport {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<String>,
    /// `false` when cleaning stopped early and a partially cleaned table was written.
    pub complete: bool,
    pub cleaning_error: Option<String>,
}

/// Builds the vendor summary and writes it to the store.
///
/// A failed aggregation aborts the run before anything is written. A failed cleaning step is
/// logged and the partially cleaned table is written anyway.
pub(crate) async fn build(db: &Db) -> Result<SummaryReport> {
    info!("Creating Vendor Summary Table...");
    let summary = match create_vendor_summary(db).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Failed to generate vendor summary: {e:#}");
            error!("Vendor summary is unavailable. Process aborted.");
            return Err(e);
        }
    };
    info!("{}", summary.head(PREVIEW_ROWS));

    info!("Cleaning Data...");
    let cleaned = clean_data(summary);
    info!("{}", cleaned.table().head(PREVIEW_ROWS));
    let cleaning_error = cleaned.error().map(|e| format!("{e:#}"));

    info!("Ingesting data...");
    let table = cleaned.into_table();
    db.replace_table(&table)
        .await
        .with_context(|| format!("Failed to ingest table '{}'", table.name()))?;
    info!("Completed");

    Ok(SummaryReport {
        table: table.name().to_string(),
        rows: table.len(),
        columns: table.column_names().into_iter().map(String::from).collect(),
        complete: cleaning_error.is_none(),
        cleaning_error,
    })
}
