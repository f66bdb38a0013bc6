use crate::model::{ColumnType, Value};
use crate::Result;
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// A named, typed column.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Column {
    name: String,
    column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }
}

/// An in-memory table: the unit that is read from CSV, written to the store, and transformed by
/// the summary.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates a table from explicit columns and rows. Every row must have one value per column.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let name = name.into();
        ensure!(!columns.is_empty(), "Table '{name}' has no columns");
        let mut seen = HashSet::new();
        for column in &columns {
            ensure!(
                seen.insert(column.name()),
                "Table '{name}' has a duplicate column '{}'",
                column.name()
            );
        }
        for (i, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == columns.len(),
                "Row {i} of table '{name}' has {} values, expected {}",
                row.len(),
                columns.len()
            );
        }
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    /// Creates a table whose column types are inferred from the values it holds.
    pub fn from_rows<S>(
        name: impl Into<String>,
        column_names: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self>
    where
        S: Into<String>,
    {
        let names: Vec<String> = column_names.into_iter().map(Into::into).collect();
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let column_type = ColumnType::infer(rows.iter().filter_map(|row| row.get(i)));
                Column::new(name, column_type)
            })
            .collect();
        Self::new(name, columns, rows)
    }

    /// Parses CSV `data` into a table called `name`.
    ///
    /// The first record is the header. Column types are inferred from the data, missing-value
    /// markers become `Null`, and text cells are kept verbatim. Short records are padded with
    /// `Null`; a record with more fields than the header is an error.
    pub fn from_csv(name: impl Into<String>, data: &[u8]) -> Result<Self> {
        let name = name.into();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let headers = reader
            .headers()
            .with_context(|| format!("Unable to read the header of '{name}'"))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<String>>();
        if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
            bail!("No columns to parse from '{name}'");
        }
        let headers = dedupe_headers(headers);
        let width = headers.len();

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record =
                record.with_context(|| format!("Unable to read record {} of '{name}'", i + 1))?;
            if record.len() > width {
                let line = record.position().map(|p| p.line()).unwrap_or(i as u64 + 2);
                bail!(
                    "Error tokenizing '{name}': expected {width} fields in line {line}, saw {}",
                    record.len()
                );
            }
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width, String::new());
            raw_rows.push(row);
        }

        let column_types: Vec<ColumnType> = (0..width)
            .map(|c| {
                let parsed: Vec<Value> = raw_rows
                    .iter()
                    .map(|row| Value::parse_field(&row[c]))
                    .collect();
                ColumnType::infer(&parsed)
            })
            .collect();

        let rows = raw_rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(column_types.iter())
                    .map(|(field, column_type)| typed_value(field, *column_type))
                    .collect()
            })
            .collect();

        let columns = headers
            .into_iter()
            .zip(column_types)
            .map(|(header, column_type)| Column::new(header, column_type))
            .collect();

        Self::new(name, columns, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Like `column_index` but fails when the column does not exist.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .with_context(|| format!("Column '{name}' not found in table '{}'", self.name))
    }

    /// Returns the value at `row` in column `name`.
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let c = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(c))
    }

    /// Iterates the values of column `c`.
    pub fn column_values(&self, c: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[c])
    }

    /// Replaces every value in column `c` and sets its type. `values` must have one entry per row.
    pub fn set_column(
        &mut self,
        c: usize,
        column_type: ColumnType,
        values: Vec<Value>,
    ) -> Result<()> {
        ensure!(
            values.len() == self.rows.len(),
            "Column '{}' needs {} values, got {}",
            self.columns[c].name(),
            self.rows.len(),
            values.len()
        );
        self.columns[c].column_type = column_type;
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[c] = value;
        }
        Ok(())
    }

    /// Appends a column, or overwrites it when a column of that name already exists.
    pub fn put_column(
        &mut self,
        name: &str,
        column_type: ColumnType,
        values: Vec<Value>,
    ) -> Result<()> {
        match self.column_index(name) {
            Some(c) => self.set_column(c, column_type, values),
            None => {
                ensure!(
                    values.len() == self.rows.len(),
                    "Column '{name}' needs {} values, got {}",
                    self.rows.len(),
                    values.len()
                );
                self.columns.push(Column::new(name, column_type));
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
                Ok(())
            }
        }
    }

    /// Applies `f` to every cell, giving it the cell's column.
    pub fn map_values(&mut self, mut f: impl FnMut(&Column, &mut Value)) {
        for row in self.rows.iter_mut() {
            for (column, value) in self.columns.iter().zip(row.iter_mut()) {
                f(column, value);
            }
        }
    }

    /// A printable view of the first `n` rows.
    pub fn head(&self, n: usize) -> Head<'_> {
        Head { table: self, n }
    }
}

/// Display adapter returned by [`Table::head`].
pub struct Head<'a> {
    table: &'a Table,
    n: usize,
}

impl Display for Head<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.table.column_names().join(" | "))?;
        for row in self.table.rows.iter().take(self.n) {
            let cells: Vec<String> = row.iter().map(Value::to_string).collect();
            write!(f, "\n{}", cells.join(" | "))?;
        }
        if self.table.len() > self.n {
            write!(f, "\n... ({} rows total)", self.table.len())?;
        }
        Ok(())
    }
}

fn typed_value(field: String, column_type: ColumnType) -> Value {
    match Value::parse_field(&field) {
        Value::Null => Value::Null,
        parsed => match column_type {
            ColumnType::Text => Value::Text(field),
            _ => parsed.conform(column_type),
        },
    }
}

/// Names empty headers `Unnamed: N` and suffixes repeated headers with `.1`, `.2`, ...
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(headers.len());
    for (i, header) in headers.into_iter().enumerate() {
        let base = if header.is_empty() {
            format!("Unnamed: {i}")
        } else {
            header
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv_infers_types() {
        let csv = "VendorNumber,VendorName,Dollars,Volume\n\
                   1, Acme Co ,100.5,750\n\
                   2,Bravo,50,Unknown\n";
        let table = Table::from_csv("purchases", csv.as_bytes()).unwrap();

        assert_eq!(table.name(), "purchases");
        assert_eq!(
            table.column_names(),
            vec!["VendorNumber", "VendorName", "Dollars", "Volume"]
        );
        let types: Vec<ColumnType> = table.columns().iter().map(|c| c.column_type()).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Integer,
                ColumnType::Text,
                ColumnType::Real,
                ColumnType::Text
            ]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(0, "VendorName"),
            Some(&Value::Text(" Acme Co ".into()))
        );
        assert_eq!(table.get(1, "Dollars"), Some(&Value::Real(50.0)));
        assert_eq!(table.get(0, "Volume"), Some(&Value::Text("750".into())));
    }

    #[test]
    fn test_from_csv_keeps_leading_zeros_in_text_columns() {
        let csv = "Code\n007\nabc\n";
        let table = Table::from_csv("codes", csv.as_bytes()).unwrap();
        assert_eq!(table.get(0, "Code"), Some(&Value::Text("007".into())));
    }

    #[test]
    fn test_from_csv_pads_short_records_with_null() {
        let csv = "a,b,c\n1,2\n";
        let table = Table::from_csv("t", csv.as_bytes()).unwrap();
        assert_eq!(table.get(0, "c"), Some(&Value::Null));
    }

    #[test]
    fn test_from_csv_rejects_long_records() {
        let csv = "a,b\n1,2,3\n";
        let err = Table::from_csv("t", csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("expected 2 fields"));
    }

    #[test]
    fn test_from_csv_empty_input() {
        assert!(Table::from_csv("t", b"").is_err());
    }

    #[test]
    fn test_from_csv_header_only() {
        let table = Table::from_csv("t", b"a,b\n").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_dedupe_headers() {
        let headers = vec!["a".to_string(), "a".to_string(), String::new(), "a".to_string()];
        assert_eq!(
            dedupe_headers(headers),
            vec!["a", "a.1", "Unnamed: 2", "a.2"]
        );
    }

    #[test]
    fn test_put_column_appends_and_overwrites() {
        let mut table = Table::from_rows(
            "t",
            ["x"],
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        )
        .unwrap();
        table
            .put_column("y", ColumnType::Real, vec![Value::Real(0.5), Value::Real(1.5)])
            .unwrap();
        assert_eq!(table.get(1, "y"), Some(&Value::Real(1.5)));

        table
            .put_column("x", ColumnType::Real, vec![Value::Real(9.0), Value::Real(8.0)])
            .unwrap();
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.get(0, "x"), Some(&Value::Real(9.0)));

        assert!(table
            .put_column("z", ColumnType::Real, vec![Value::Null])
            .is_err());
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let columns = vec![
            Column::new("a", ColumnType::Integer),
            Column::new("b", ColumnType::Integer),
        ];
        assert!(Table::new("t", columns, vec![vec![Value::Integer(1)]]).is_err());
    }

    #[test]
    fn test_head_display() {
        let table = Table::from_rows(
            "t",
            ["a", "b"],
            vec![
                vec![Value::Integer(1), Value::Text("x".into())],
                vec![Value::Integer(2), Value::Null],
            ],
        )
        .unwrap();
        assert_eq!(
            table.head(1).to_string(),
            "a | b\n1 | x\n... (2 rows total)"
        );
    }
}
