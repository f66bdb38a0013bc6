//! This module is responsible for reading and writing tables in the SQLite store.
//!
//! Every write replaces a whole table. The replacement is staged under a temporary name and
//! swapped in inside a single transaction, so readers never observe an empty or half-written
//! table.

use crate::model::{Column, ColumnType, Table, Value};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool, ValueRef};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Handle to the SQLite store. Holds a single connection.
#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
    path: PathBuf,
}

/// Name, columns and row count of a stored table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name.
    pub name: String,
    /// Number of rows in the table.
    pub row_count: u64,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
}

impl Db {
    /// Opens the SQLite file at `path`, creating it if it does not exist.
    pub(crate) async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Unable to open SQLite database at {}", path.display()))?;

        debug!("Opened SQLite database at {}", path.display());
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `table` under its own name, replacing any existing table of that name.
    ///
    /// The rows are inserted into a staging table which then takes the place of the old table in
    /// the same transaction. If anything fails the transaction rolls back and the old table (if
    /// any) is untouched.
    pub(crate) async fn replace_table(&self, table: &Table) -> Result<()> {
        let name = table.name();
        let staging = format!("{name}__staging_{}", uuid::Uuid::new_v4().simple());

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin table replace transaction")?;

        sqlx::query(&create_table_sql(&staging, table.columns()))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to create staging table for '{name}'"))?;

        let insert = insert_sql(&staging, table.columns());
        for (i, row) in table.rows().iter().enumerate() {
            let mut query = sqlx::query(&insert);
            for value in row {
                query = bind_value(query, value);
            }
            query
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert row {i} into '{name}'"))?;
        }

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to drop previous table '{name}'"))?;

        sqlx::query(&format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(&staging),
            quote_ident(name)
        ))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to swap staging table into '{name}'"))?;

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit table '{name}'"))?;

        info!("Successfully ingested table '{name}' into the database.");
        Ok(())
    }

    /// Returns `true` if a table called `name` exists.
    pub(crate) async fn table_exists(&self, name: &str) -> Result<bool> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .context("Failed to check table existence")?;
        Ok(row.0 > 0)
    }

    /// Names of all user tables, sorted.
    pub(crate) async fn table_names(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tables")?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Declared columns of table `name`, in order.
    pub(crate) async fn columns(&self, name: &str) -> Result<Vec<Column>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT name, type FROM pragma_table_info(?) ORDER BY cid")
                .bind(name)
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("Failed to read columns of '{name}'"))?;
        Ok(rows
            .into_iter()
            .map(|(column, declared)| Column::new(column, ColumnType::from_declared(&declared)))
            .collect())
    }

    pub(crate) async fn row_count(&self, name: &str) -> Result<u64> {
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", quote_ident(name)))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count rows of '{name}'"))?;
        Ok(u64::try_from(row.0).unwrap_or_default())
    }

    /// Name, columns and row count of every table.
    pub(crate) async fn table_infos(&self) -> Result<Vec<TableInfo>> {
        let mut infos = Vec::new();
        for name in self.table_names().await? {
            let columns = self.columns(&name).await?;
            let row_count = self.row_count(&name).await?;
            infos.push(TableInfo {
                name,
                row_count,
                columns,
            });
        }
        Ok(infos)
    }

    /// Reads the whole of table `name`.
    #[cfg(test)]
    pub(crate) async fn read_table(&self, name: &str) -> Result<Table> {
        anyhow::ensure!(self.table_exists(name).await?, "Table '{name}' does not exist");
        let columns = self.columns(name).await?;
        let sql = format!("SELECT * FROM {}", quote_ident(name));
        let rows = self.fetch_rows(&sql).await?;
        Table::new(name, columns, rows)
    }

    /// Runs a read query and returns its rows as values. Each row has as many values as the query
    /// has result columns.
    pub(crate) async fn fetch_rows(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to execute query")?;
        rows.iter().map(row_values).collect()
    }
}

/// Quotes an SQL identifier so that any file-derived name is safe to use.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(name: &str, columns: &[Column]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(c.name()), c.column_type()))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(name), defs.join(", "))
}

fn insert_sql(name: &str, columns: &[Column]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c.name())).collect();
    let params = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({params})",
        quote_ident(name),
        names.join(", ")
    )
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Integer(i) => query.bind(*i),
        Value::Real(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.as_str()),
    }
}

/// Converts a result row to values using the storage class of each cell.
fn row_values(row: &SqliteRow) -> Result<Vec<Value>> {
    (0..row.len())
        .map(|i| {
            let storage = {
                let raw = row.try_get_raw(i).context("Failed to read column value")?;
                if raw.is_null() {
                    None
                } else {
                    Some(sqlx::TypeInfo::name(&*raw.type_info()).to_string())
                }
            };
            let value = match storage.as_deref() {
                None => Value::Null,
                Some("INTEGER") => Value::Integer(row.try_get(i)?),
                Some("REAL") => Value::Real(row.try_get(i)?),
                Some(_) => Value::Text(row.try_get(i)?),
            };
            Ok(value)
        })
        .collect()
}
